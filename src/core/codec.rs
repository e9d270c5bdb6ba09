//! Tokio codec framing [`Bucket`]s over an async byte stream.
//!
//! The decoder validates incrementally: the signature as soon as 8 bytes are
//! buffered, length and command as soon as the full header is buffered. It
//! never reserves more than a bounded amount of space ahead of the data.

use crate::config::FramerLimits;
use crate::core::bucket::{check_signature, Bucket, BucketHeader, BUCKET_HEADER_SIZE, SIGNATURE_SIZE};
use crate::error::ProtocolError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Most space reserved at once while waiting for a payload
const MAX_RESERVE_AHEAD: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketCodec {
    limits: FramerLimits,
}

impl BucketCodec {
    pub fn new(limits: FramerLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &FramerLimits {
        &self.limits
    }
}

impl Decoder for BucketCodec {
    type Item = Bucket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < SIGNATURE_SIZE {
            return Ok(None);
        }
        let mut peek = &src[..SIGNATURE_SIZE];
        check_signature(peek.get_u64_le())?;

        if src.len() < BUCKET_HEADER_SIZE {
            return Ok(None);
        }
        let header = BucketHeader::parse(&src[..BUCKET_HEADER_SIZE], &self.limits)?;

        let payload_len = header.payload_len as usize;
        let frame_len = BUCKET_HEADER_SIZE + payload_len;
        if src.len() < frame_len {
            src.reserve((frame_len - src.len()).min(MAX_RESERVE_AHEAD));
            return Ok(None);
        }

        src.advance(BUCKET_HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Bucket::from_payload(header, payload)))
    }
}

impl Encoder<Bucket> for BucketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bucket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.encoded_len());
        item.header().encode(dst);
        dst.put_slice(item.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::core::section::Section;
    use crate::protocol::command::Command;

    fn sample() -> Bucket {
        Bucket::request(Command::TimedSync, &Section::new().with("x", 5u32)).unwrap()
    }

    #[test]
    fn test_decode_complete_frame() {
        let bucket = sample();
        let mut buf = BytesMut::from(&bucket.to_bytes()[..]);
        let decoded = BucketCodec::default().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, bucket);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits() {
        let bytes = sample().to_bytes();
        let mut codec = BucketCodec::default();
        let mut buf = BytesMut::from(&bytes[..BUCKET_HEADER_SIZE + 2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), BUCKET_HEADER_SIZE + 2);
    }

    #[test]
    fn test_signature_rejected_early() {
        let mut buf = BytesMut::from(&[0u8; SIGNATURE_SIZE][..]);
        assert!(matches!(
            BucketCodec::default().decode(&mut buf),
            Err(ProtocolError::BadSignature { .. })
        ));
    }

    #[test]
    fn test_oversized_rejected_from_header_alone() {
        let mut codec = BucketCodec::new(FramerLimits {
            max_payload_size: 8,
            ..FramerLimits::default()
        });
        let header = BucketHeader::request(Command::Ping, 9);
        let mut buf = BytesMut::from(&header.to_bytes()[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::PacketTooLarge { size: 9, limit: 8 })
        ));
    }

    #[test]
    fn test_encode_matches_to_bytes() {
        let bucket = sample();
        let mut buf = BytesMut::new();
        BucketCodec::default().encode(bucket.clone(), &mut buf).unwrap();
        assert_eq!(&buf[..], &bucket.to_bytes()[..]);
    }
}
