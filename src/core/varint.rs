//! # VarInt Codec
//!
//! Variable-length unsigned integers used for entry counts, array lengths and
//! string lengths in portable storage.
//!
//! The two low bits of the first byte select a size class; the value itself
//! occupies the remaining bits of a little-endian integer of that class's
//! width.
//!
//! ```text
//! tag 00 -> 1 byte  (6 bits,  max 63)
//! tag 01 -> 2 bytes (14 bits, max 16383)
//! tag 10 -> 4 bytes (30 bits, max 1073741823)
//! tag 11 -> 8 bytes (62 bits, max 4611686018427387903)
//! ```

use crate::core::primitive::ensure_remaining;
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut};

/// Mask selecting the size-class tag from the first byte
pub const SIZE_MARK_MASK: u8 = 0b11;

/// Largest value a VarInt can carry (2^62 - 1)
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// Size class of an encoded VarInt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Byte = 0,
    Word = 1,
    DWord = 2,
    Int64 = 3,
}

impl SizeClass {
    /// Total encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            SizeClass::Byte => 1,
            SizeClass::Word => 2,
            SizeClass::DWord => 4,
            SizeClass::Int64 => 8,
        }
    }

    /// Largest value representable in this class
    pub const fn max_value(self) -> u64 {
        (1u64 << (self.width() * 8 - 2)) - 1
    }

    /// Smallest class able to hold `value`
    pub fn for_value(value: u64) -> Result<Self> {
        [
            SizeClass::Byte,
            SizeClass::Word,
            SizeClass::DWord,
            SizeClass::Int64,
        ]
        .into_iter()
        .find(|class| value <= class.max_value())
        .ok_or(ProtocolError::VarIntOverflow(value))
    }

    fn from_mark(first: u8) -> Self {
        match first & SIZE_MARK_MASK {
            0 => SizeClass::Byte,
            1 => SizeClass::Word,
            2 => SizeClass::DWord,
            _ => SizeClass::Int64,
        }
    }
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u64) -> Result<usize> {
    SizeClass::for_value(value).map(SizeClass::width)
}

/// Append `value` using the smallest size class that holds it.
pub fn write_varint<B: BufMut>(value: u64, out: &mut B) -> Result<()> {
    let class = SizeClass::for_value(value)?;
    let packed = (value << 2) | class as u64;
    out.put_slice(&packed.to_le_bytes()[..class.width()]);
    Ok(())
}

/// Read one VarInt.
///
/// Every byte after the first is shifted by its own position (`8 * i`), so all
/// four classes reconstruct the full little-endian integer before the tag
/// bits are dropped.
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<u64> {
    ensure_remaining(buf, 1)?;
    let first = buf.get_u8();
    let class = SizeClass::from_mark(first);
    if class == SizeClass::Byte {
        return Ok(u64::from(first >> 2));
    }

    ensure_remaining(buf, class.width() - 1)?;
    let mut packed = u64::from(first);
    for position in 1..class.width() {
        packed |= u64::from(buf.get_u8()) << (8 * position);
    }
    Ok(packed >> 2)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use bytes::BytesMut;

    fn encode(value: u64) -> Vec<u8> {
        let mut out = BytesMut::new();
        write_varint(value, &mut out).expect("encodable");
        out.to_vec()
    }

    #[test]
    fn test_boundary_values_roundtrip() {
        for value in [
            0u64,
            63,
            64,
            16383,
            16384,
            1073741823,
            1073741824,
            4611686018427387903,
        ] {
            let bytes = encode(value);
            let mut buf = &bytes[..];
            assert_eq!(read_varint(&mut buf).unwrap(), value, "value {value}");
            assert!(buf.is_empty(), "value {value} left trailing bytes");
        }
    }

    #[test]
    fn test_size_class_selection() {
        assert_eq!(encode(63).len(), 1);
        assert_eq!(encode(64).len(), 2);
        assert_eq!(encode(16383).len(), 2);
        assert_eq!(encode(16384).len(), 4);
        assert_eq!(encode(1073741823).len(), 4);
        assert_eq!(encode(1073741824).len(), 8);
        assert_eq!(encoded_len(MAX_VARINT).unwrap(), 8);
    }

    #[test]
    fn test_word_byte_layout() {
        // (64 << 2) | 0b01 = 0x0101
        assert_eq!(encode(64), vec![0x01, 0x01]);
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(63), vec![0xFC]);
    }

    #[test]
    fn test_dword_uses_positional_shift() {
        // 0x0123_4567 << 2 | 0b10 = 0x048D_159E
        let value = 0x0123_4567;
        assert_eq!(encode(value), vec![0x9E, 0x15, 0x8D, 0x04]);
        let mut buf = &[0x9E, 0x15, 0x8D, 0x04][..];
        assert_eq!(read_varint(&mut buf).unwrap(), value);
    }

    #[test]
    fn test_overflow_rejected() {
        let mut out = BytesMut::new();
        let err = write_varint(4611686018427387904, &mut out).unwrap_err();
        assert!(matches!(err, ProtocolError::VarIntOverflow(4611686018427387904)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_multibyte() {
        let mut buf = &[0x02, 0x00][..];
        assert!(matches!(
            read_varint(&mut buf),
            Err(ProtocolError::TruncatedInput { needed: 3, .. })
        ));

        let mut empty: &[u8] = &[];
        assert!(matches!(
            read_varint(&mut empty),
            Err(ProtocolError::TruncatedInput { needed: 1, .. })
        ));
    }
}
