//! # Portable Storage
//!
//! Recursive reader and writer for the self-describing binary value format
//! carried inside bucket payloads.
//!
//! ## Wire Format
//! ```text
//! [SigA(4)=0x01011101] [SigB(4)=0x01020101] [Version(1)=1] [Section]
//!
//! Section := [Count(varint)] { [NameLen(1)] [Name(NameLen)] [Entry] }*
//! Entry   := [Tag(1)] [Value]                           scalar / object
//!          | [Tag|0x80(1)] [Count(varint)] [Value]*      array
//!          | [0x0D] [Tag(1)] [Count(varint)] [Value]*    legacy array wrapper
//! Value   := fixed-width primitive
//!          | [Len(varint)] [Bytes(Len)]                  string
//!          | Section                                     object
//! ```
//!
//! Array elements are written without their own tag; the element type comes
//! from the array header.
//!
//! ## Security
//! - Counts and lengths are checked against the remaining input
//! - Containers preallocate at most [`MAX_PREALLOC_ENTRIES`] slots and grow
//!   as entries actually decode, so a declared count costs nothing until
//!   the bytes behind it arrive
//! - Nesting depth is capped at [`MAX_NESTING_DEPTH`]

use crate::core::primitive::{ensure_remaining, Primitive};
use crate::core::section::Section;
use crate::core::value::{Array, ByteString, Entry, Scalar, TypeTag, ARRAY_FLAG, ARRAY_WRAPPER};
use crate::core::varint::{read_varint, write_varint};
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// First signature word of a portable-storage blob
pub const PORTABLE_STORAGE_SIGNATURE_A: u32 = 0x0101_1101;

/// Second signature word of a portable-storage blob
pub const PORTABLE_STORAGE_SIGNATURE_B: u32 = 0x0102_0101;

/// The only supported format version
pub const PORTABLE_STORAGE_FORMAT_VERSION: u8 = 1;

/// Size of the signature + version prefix
pub const STORAGE_HEADER_SIZE: usize = 9;

/// Deepest section nesting the reader accepts
pub const MAX_NESTING_DEPTH: usize = 100;

/// Upper bound on slots reserved up front for a section or array
pub const MAX_PREALLOC_ENTRIES: usize = 256;

/// Largest section name the format can carry
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Serialize `section` with the portable-storage header.
pub fn encode_section(section: &Section) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(STORAGE_HEADER_SIZE + 64);
    encode_section_into(section, &mut out)?;
    Ok(out.freeze())
}

/// Serialize `section` with the portable-storage header into `out`.
pub fn encode_section_into<B: BufMut>(section: &Section, out: &mut B) -> Result<()> {
    let mut writer = StorageWriter { out };
    writer.write_header();
    writer.write_section(section)
}

/// Parse a portable-storage blob into its top-level section.
///
/// Bytes following the top-level section are ignored; the bucket header
/// already fixed the payload length.
pub fn decode_section(bytes: &[u8]) -> Result<Section> {
    let mut reader = StorageReader::new(bytes);
    reader.read_header()?;
    reader.read_section()
}

/// Cursor-driven portable-storage decoder.
pub struct StorageReader<B> {
    buf: B,
    depth: usize,
}

impl<B: Buf> StorageReader<B> {
    pub fn new(buf: B) -> Self {
        Self { buf, depth: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Validate the two signature words and the version byte.
    pub fn read_header(&mut self) -> Result<()> {
        ensure_remaining(&self.buf, STORAGE_HEADER_SIZE)?;

        let sig_a = self.buf.get_u32_le();
        if sig_a != PORTABLE_STORAGE_SIGNATURE_A {
            return Err(ProtocolError::BadSignature {
                expected: PORTABLE_STORAGE_SIGNATURE_A.into(),
                found: sig_a.into(),
            });
        }

        let sig_b = self.buf.get_u32_le();
        if sig_b != PORTABLE_STORAGE_SIGNATURE_B {
            return Err(ProtocolError::BadSignature {
                expected: PORTABLE_STORAGE_SIGNATURE_B.into(),
                found: sig_b.into(),
            });
        }

        let version = self.buf.get_u8();
        if version != PORTABLE_STORAGE_FORMAT_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        Ok(())
    }

    /// Read a count-prefixed list of named entries.
    pub fn read_section(&mut self) -> Result<Section> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ProtocolError::DepthLimitExceeded(MAX_NESTING_DEPTH));
        }
        self.depth += 1;

        let count = self.read_count()?;
        let mut section = Section::with_capacity(count.min(MAX_PREALLOC_ENTRIES));
        for _ in 0..count {
            let name = self.read_name()?;
            let entry = self.read_entry()?;
            section.insert(name, entry);
        }

        self.depth -= 1;
        Ok(section)
    }

    fn read_name(&mut self) -> Result<ByteString> {
        ensure_remaining(&self.buf, 1)?;
        let len = usize::from(self.buf.get_u8());
        ensure_remaining(&self.buf, len)?;
        Ok(ByteString::from(self.buf.copy_to_bytes(len)))
    }

    fn read_entry(&mut self) -> Result<Entry> {
        ensure_remaining(&self.buf, 1)?;
        let tag = self.buf.get_u8();

        if tag & ARRAY_FLAG != 0 {
            return self.read_array(tag & !ARRAY_FLAG);
        }

        if tag == ARRAY_WRAPPER {
            ensure_remaining(&self.buf, 1)?;
            let inner = self.buf.get_u8();
            if inner & ARRAY_FLAG != 0 {
                return Err(ProtocolError::MalformedArray(format!(
                    "wrapped element tag {inner:#04x} carries the array flag"
                )));
            }
            return self.read_array(inner);
        }

        let tag = TypeTag::try_from(tag)?;
        self.read_value(tag)
    }

    fn read_array(&mut self, element: u8) -> Result<Entry> {
        if element == ARRAY_WRAPPER {
            return Err(ProtocolError::MalformedArray(
                constants::ERR_NESTED_ARRAY.to_string(),
            ));
        }
        let element = TypeTag::try_from(element)?;

        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC_ENTRIES));
        for _ in 0..count {
            items.push(self.read_value(element)?);
        }
        Ok(Entry::Array(Array::with_items(element, items)?))
    }

    /// Decode one value of type `tag` (no tag byte in front of it).
    fn read_value(&mut self, tag: TypeTag) -> Result<Entry> {
        match tag {
            TypeTag::String => {
                let len = self.read_varint_len()?;
                ensure_remaining(&self.buf, len)?;
                Ok(ByteString::from(self.buf.copy_to_bytes(len)).into())
            }
            TypeTag::Object => Ok(Entry::Object(self.read_section()?)),
            _ => match Primitive::decode(tag, &mut self.buf)? {
                Some(p) => Ok(p.into()),
                None => Err(ProtocolError::UnknownType(tag.as_u8())),
            },
        }
    }

    /// VarInt element count; every element occupies at least one byte, so a
    /// count larger than the remaining input is already known to be short.
    fn read_count(&mut self) -> Result<usize> {
        let count = self.read_varint_len()?;
        if count > self.buf.remaining() {
            return Err(ProtocolError::truncated(count, self.buf.remaining()));
        }
        Ok(count)
    }

    fn read_varint_len(&mut self) -> Result<usize> {
        let value = read_varint(&mut self.buf)?;
        Ok(usize::try_from(value).unwrap_or(usize::MAX))
    }
}

/// Portable-storage encoder writing into any [`BufMut`].
pub struct StorageWriter<'a, B> {
    out: &'a mut B,
}

impl<'a, B: BufMut> StorageWriter<'a, B> {
    pub fn new(out: &'a mut B) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self) {
        self.out.put_u32_le(PORTABLE_STORAGE_SIGNATURE_A);
        self.out.put_u32_le(PORTABLE_STORAGE_SIGNATURE_B);
        self.out.put_u8(PORTABLE_STORAGE_FORMAT_VERSION);
    }

    pub fn write_section(&mut self, section: &Section) -> Result<()> {
        write_varint(section.len() as u64, self.out)?;
        for (name, entry) in section.iter() {
            if name.is_empty() || name.len() > MAX_NAME_LEN {
                return Err(ProtocolError::ValueOutOfRange(format!(
                    "section name length {} outside 1..={MAX_NAME_LEN}",
                    name.len()
                )));
            }
            self.out.put_u8(name.len() as u8);
            self.out.put_slice(name);
            self.write_entry(entry)?;
        }
        Ok(())
    }

    fn write_entry(&mut self, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Array(array) => {
                self.out.put_u8(array.element_type().array_tag());
                write_varint(array.len() as u64, self.out)?;
                for item in array {
                    self.write_value(item)?;
                }
                Ok(())
            }
            Entry::Scalar(scalar) => {
                self.out.put_u8(scalar.type_tag().as_u8());
                self.write_value(entry)
            }
            Entry::Object(_) => {
                self.out.put_u8(TypeTag::Object.as_u8());
                self.write_value(entry)
            }
        }
    }

    fn write_value(&mut self, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Scalar(Scalar::Primitive(p)) => p.encode(self.out),
            Entry::Scalar(Scalar::String(s)) => {
                write_varint(s.len() as u64, self.out)?;
                self.out.put_slice(s);
                Ok(())
            }
            Entry::Object(section) => self.write_section(section),
            Entry::Array(_) => Err(ProtocolError::MalformedArray(
                constants::ERR_NESTED_ARRAY.to_string(),
            )),
        }
    }
}
