//! # Bucket Framing
//!
//! The fixed 33-byte Levin header and the blocking receive loop that
//! assembles one bucket from a byte stream.
//!
//! ## Wire Format
//! ```text
//! [Signature(8)] [Cb(8)] [ReturnData(1)] [Command(4)] [ReturnCode(4)] [Flags(4)] [Version(4)] [Payload(Cb)]
//! ```
//! All fields are little-endian.
//!
//! ## Security
//! - Signature is checked before anything else is read
//! - Declared payload length is checked against [`FramerLimits`] before the
//!   rest of the header is read and before any payload buffer is reserved
//! - Payload is accumulated in bounded reads; the buffer grows with the data
//!   that actually arrives rather than with the length the peer claims

use crate::config::{
    FramerLimits, LEVIN_OK, LEVIN_PACKET_REQUEST, LEVIN_PACKET_RESPONSE, LEVIN_PROTOCOL_VERSION,
    LEVIN_SIGNATURE,
};
use crate::core::section::Section;
use crate::core::storage::{decode_section, encode_section};
use crate::error::{ProtocolError, Result};
use crate::protocol::command::Command;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{ErrorKind, Read};
use tracing::{debug, trace, warn};

/// Size of the fixed bucket header, signature included
pub const BUCKET_HEADER_SIZE: usize = 33;

/// Size of the leading signature field
pub const SIGNATURE_SIZE: usize = 8;

/// Upper bound on the payload buffer reserved before any payload arrives
const INITIAL_PAYLOAD_RESERVE: usize = 64 * 1024;

/// Fixed header fields of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketHeader {
    /// Payload length in bytes (`cb` on the wire)
    pub payload_len: u64,
    /// Sender expects an answer (`return_data` on the wire)
    pub is_request: bool,
    pub command: Command,
    /// Meaningful on responses only
    pub return_code: i32,
    pub flags: u32,
    pub protocol_version: u32,
}

impl BucketHeader {
    /// Header of a request carrying `payload_len` bytes
    pub fn request(command: Command, payload_len: u64) -> Self {
        Self {
            payload_len,
            is_request: true,
            command,
            return_code: LEVIN_OK,
            flags: LEVIN_PACKET_REQUEST,
            protocol_version: LEVIN_PROTOCOL_VERSION,
        }
    }

    /// Header of a response carrying `payload_len` bytes
    pub fn response(command: Command, payload_len: u64, return_code: i32) -> Self {
        Self {
            payload_len,
            is_request: false,
            command,
            return_code,
            flags: LEVIN_PACKET_RESPONSE,
            protocol_version: LEVIN_PROTOCOL_VERSION,
        }
    }

    /// Whether the flags mark this bucket as a response
    pub fn is_response(&self) -> bool {
        self.flags & LEVIN_PACKET_RESPONSE != 0
    }

    /// Write the 33 header bytes, signature first
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u64_le(LEVIN_SIGNATURE);
        out.put_u64_le(self.payload_len);
        out.put_u8(u8::from(self.is_request));
        out.put_u32_le(self.command.code());
        out.put_i32_le(self.return_code);
        out.put_u32_le(self.flags);
        out.put_u32_le(self.protocol_version);
    }

    pub fn to_bytes(&self) -> [u8; BUCKET_HEADER_SIZE] {
        let mut bytes = [0u8; BUCKET_HEADER_SIZE];
        self.encode(&mut &mut bytes[..]);
        bytes
    }

    /// Parse and validate a header from the start of `bytes`.
    pub fn parse(bytes: &[u8], limits: &FramerLimits) -> Result<Self> {
        let mut buf = bytes;
        if buf.remaining() < SIGNATURE_SIZE {
            return Err(ProtocolError::truncated(SIGNATURE_SIZE, buf.remaining()));
        }
        check_signature(buf.get_u64_le())?;

        if buf.remaining() < 8 {
            return Err(ProtocolError::truncated(8, buf.remaining()));
        }
        let payload_len = buf.get_u64_le();
        check_payload_len(payload_len, limits)?;

        Self::parse_fields(payload_len, &mut buf)
    }

    /// Remaining fields after signature and length have been validated.
    fn parse_fields(payload_len: u64, buf: &mut &[u8]) -> Result<Self> {
        const FIELDS_SIZE: usize = BUCKET_HEADER_SIZE - SIGNATURE_SIZE - 8;
        if buf.remaining() < FIELDS_SIZE {
            return Err(ProtocolError::truncated(FIELDS_SIZE, buf.remaining()));
        }
        let is_request = buf.get_u8() != 0;
        let code = buf.get_u32_le();
        let return_code = buf.get_i32_le();
        let flags = buf.get_u32_le();
        let protocol_version = buf.get_u32_le();

        let command = Command::try_from(code).inspect_err(|_| {
            warn!(command = code, "Rejected bucket with unknown command");
        })?;

        Ok(Self {
            payload_len,
            is_request,
            command,
            return_code,
            flags,
            protocol_version,
        })
    }
}

/// Fail with `BadSignature` unless `signature` is the Levin magic
pub fn check_signature(signature: u64) -> Result<()> {
    if signature != LEVIN_SIGNATURE {
        warn!(found = %format!("{signature:#018x}"), "Rejected bucket signature");
        return Err(ProtocolError::BadSignature {
            expected: LEVIN_SIGNATURE,
            found: signature,
        });
    }
    Ok(())
}

fn check_payload_len(payload_len: u64, limits: &FramerLimits) -> Result<()> {
    if payload_len > limits.max_payload_size {
        warn!(
            payload_len,
            limit = limits.max_payload_size,
            "Rejected oversized bucket"
        );
        return Err(ProtocolError::PacketTooLarge {
            size: payload_len,
            limit: limits.max_payload_size,
        });
    }
    Ok(())
}

/// Concatenate `header` and `payload`.
///
/// The header's declared length must match the payload.
pub fn pack_bucket(header: &BucketHeader, payload: &[u8]) -> Result<Bytes> {
    if header.payload_len != payload.len() as u64 {
        return Err(ProtocolError::ValueOutOfRange(format!(
            "header declares {} payload bytes, got {}",
            header.payload_len,
            payload.len()
        )));
    }
    let mut out = BytesMut::with_capacity(BUCKET_HEADER_SIZE + payload.len());
    header.encode(&mut out);
    out.put_slice(payload);
    Ok(out.freeze())
}

/// One Levin packet: header plus the portable-storage payload it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    header: BucketHeader,
    payload: Bytes,
}

impl Bucket {
    /// Request bucket carrying `section`
    pub fn request(command: Command, section: &Section) -> Result<Self> {
        let payload = encode_section(section)?;
        Ok(Self {
            header: BucketHeader::request(command, payload.len() as u64),
            payload,
        })
    }

    /// Response bucket carrying `section`
    pub fn response(command: Command, section: &Section, return_code: i32) -> Result<Self> {
        let payload = encode_section(section)?;
        Ok(Self {
            header: BucketHeader::response(command, payload.len() as u64, return_code),
            payload,
        })
    }

    /// Bucket from an already serialized payload; the header's length is
    /// overwritten with the payload's
    pub fn from_payload(mut header: BucketHeader, payload: Bytes) -> Self {
        header.payload_len = payload.len() as u64;
        Self { header, payload }
    }

    pub fn header(&self) -> &BucketHeader {
        &self.header
    }

    pub fn command(&self) -> Command {
        self.header.command
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn header_bytes(&self) -> [u8; BUCKET_HEADER_SIZE] {
        self.header.to_bytes()
    }

    /// Header followed by payload, ready for the wire
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.header.encode(&mut out);
        out.put_slice(&self.payload);
        out.freeze()
    }

    pub fn encoded_len(&self) -> usize {
        BUCKET_HEADER_SIZE + self.payload.len()
    }

    /// Decode the payload
    pub fn section(&self) -> Result<Section> {
        decode_section(&self.payload)
    }

    pub fn into_parts(self) -> (BucketHeader, Bytes) {
        (self.header, self.payload)
    }
}

/// Read one bucket from `reader` and decode its payload.
pub fn read_bucket<R: Read>(reader: &mut R, limits: &FramerLimits) -> Result<(BucketHeader, Section)> {
    let bucket = read_raw_bucket(reader, limits)?;
    let section = bucket.section()?;
    let (header, _) = bucket.into_parts();
    Ok((header, section))
}

/// Continue reading a bucket whose 8 signature bytes the caller already
/// consumed from `reader`.
pub fn read_bucket_with_signature<R: Read>(
    signature: [u8; SIGNATURE_SIZE],
    reader: &mut R,
    limits: &FramerLimits,
) -> Result<(BucketHeader, Section)> {
    check_signature(u64::from_le_bytes(signature))?;
    let bucket = read_after_signature(reader, limits)?;
    let section = bucket.section()?;
    Ok((bucket.header, section))
}

/// Read one bucket from `reader` without decoding its payload.
pub fn read_raw_bucket<R: Read>(reader: &mut R, limits: &FramerLimits) -> Result<Bucket> {
    let mut signature = [0u8; SIGNATURE_SIZE];
    read_full(reader, &mut signature)?;
    check_signature(u64::from_le_bytes(signature))?;
    read_after_signature(reader, limits)
}

fn read_after_signature<R: Read>(reader: &mut R, limits: &FramerLimits) -> Result<Bucket> {
    let mut cb = [0u8; 8];
    read_full(reader, &mut cb)?;
    let payload_len = u64::from_le_bytes(cb);
    check_payload_len(payload_len, limits)?;

    let mut fields = [0u8; BUCKET_HEADER_SIZE - SIGNATURE_SIZE - 8];
    read_full(reader, &mut fields)?;
    let header = BucketHeader::parse_fields(payload_len, &mut &fields[..])?;

    // Bounded by max_payload_size, which is checked above.
    let payload = accumulate_payload(reader, payload_len as usize, limits.read_chunk_size)?;

    debug!(
        command = %header.command,
        payload_len,
        request = header.is_request,
        "<< received bucket"
    );
    Ok(Bucket {
        header,
        payload: Bytes::from(payload),
    })
}

/// Collect exactly `len` bytes using reads of at most `chunk_size` bytes.
///
/// Short reads are expected on sockets and simply continue; end of stream
/// before `len` bytes is `TruncatedInput`.
fn accumulate_payload<R: Read>(reader: &mut R, len: usize, chunk_size: usize) -> Result<Vec<u8>> {
    let chunk_size = chunk_size.max(1);
    let mut payload = Vec::with_capacity(len.min(INITIAL_PAYLOAD_RESERVE));
    let mut chunk = vec![0u8; chunk_size.min(len.max(1))];

    while payload.len() < len {
        let want = chunk.len().min(len - payload.len());
        match reader.read(&mut chunk[..want]) {
            Ok(0) => return Err(ProtocolError::truncated(len, payload.len())),
            Ok(n) => {
                payload.extend_from_slice(&chunk[..n]);
                trace!(received = payload.len(), expected = len, "Accumulating payload");
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(payload)
}

/// `read_exact` that reports end of stream as `TruncatedInput`.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(ProtocolError::truncated(buf.len(), filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(())
}
