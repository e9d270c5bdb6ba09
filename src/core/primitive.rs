//! # Primitive Codec
//!
//! Fixed-width integer, boolean and double encoding.
//!
//! Integers are range-checked against their declared width and signedness
//! before a single byte is written, and decoding never pads: a short input is
//! a [`ProtocolError::TruncatedInput`], not a zero-extended value.
//!
//! Everything on the wire is little-endian. Big-endian exists only so callers
//! can reinterpret address fields (see `protocol::message::peer_list`).

use crate::core::value::TypeTag;
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut};

/// Byte order of a fixed-width integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Width, signedness and byte order of a fixed-width integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntFormat {
    pub width: usize,
    pub signed: bool,
    pub endian: Endian,
}

impl IntFormat {
    pub const U8: IntFormat = IntFormat::le(1, false);
    pub const I8: IntFormat = IntFormat::le(1, true);
    pub const U16: IntFormat = IntFormat::le(2, false);
    pub const I16: IntFormat = IntFormat::le(2, true);
    pub const U32: IntFormat = IntFormat::le(4, false);
    pub const I32: IntFormat = IntFormat::le(4, true);
    pub const U64: IntFormat = IntFormat::le(8, false);
    pub const I64: IntFormat = IntFormat::le(8, true);

    /// Little-endian format of `width` bytes
    pub const fn le(width: usize, signed: bool) -> Self {
        Self {
            width,
            signed,
            endian: Endian::Little,
        }
    }

    /// Same width and signedness, big-endian
    pub const fn big_endian(self) -> Self {
        Self {
            endian: Endian::Big,
            ..self
        }
    }

    /// Smallest representable value
    pub fn min(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width * 8 - 1))
        } else {
            0
        }
    }

    /// Largest representable value
    pub fn max(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width * 8 - 1)) - 1
        } else {
            (1i128 << (self.width * 8)) - 1
        }
    }

    fn check_width(&self) -> Result<()> {
        if (1..=8).contains(&self.width) {
            Ok(())
        } else {
            Err(ProtocolError::ValueOutOfRange(format!(
                "unsupported integer width {}",
                self.width
            )))
        }
    }

    fn describe(&self) -> String {
        let sign = if self.signed { "signed" } else { "unsigned" };
        format!("{}-byte {sign} integer", self.width)
    }
}

/// Encode `value` as a fixed-width integer.
///
/// Fails with `ValueOutOfRange` instead of truncating when the value does not
/// fit the two's-complement range of `format`.
pub fn encode_int<B: BufMut>(value: i128, format: IntFormat, out: &mut B) -> Result<()> {
    format.check_width()?;
    if value < format.min() || value > format.max() {
        return Err(ProtocolError::ValueOutOfRange(format!(
            "{value} does not fit in a {}",
            format.describe()
        )));
    }

    // In-range values keep their two's-complement bits in the low 64.
    let le = (value as u64).to_le_bytes();
    let bytes = &le[..format.width];
    match format.endian {
        Endian::Little => out.put_slice(bytes),
        Endian::Big => {
            for b in bytes.iter().rev() {
                out.put_u8(*b);
            }
        }
    }
    Ok(())
}

/// Decode exactly `format.width` bytes as an integer.
pub fn decode_int<B: Buf>(buf: &mut B, format: IntFormat) -> Result<i128> {
    format.check_width()?;
    ensure_remaining(buf, format.width)?;

    let mut le = [0u8; 8];
    buf.copy_to_slice(&mut le[..format.width]);
    if format.endian == Endian::Big {
        le[..format.width].reverse();
    }

    let raw = u64::from_le_bytes(le);
    let bits = format.width * 8;
    if format.signed && bits < 64 && raw & (1u64 << (bits - 1)) != 0 {
        Ok(raw as i128 - (1i128 << bits))
    } else if format.signed && bits == 64 {
        Ok(raw as i64 as i128)
    } else {
        Ok(raw as i128)
    }
}

/// Encode a boolean as a single `0x00`/`0x01` byte.
pub fn encode_bool<B: BufMut>(value: bool, out: &mut B) {
    out.put_u8(u8::from(value));
}

/// Decode a boolean byte. Only `0x00` and `0x01` are accepted.
pub fn decode_bool<B: Buf>(buf: &mut B) -> Result<bool> {
    ensure_remaining(buf, 1)?;
    match buf.get_u8() {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(ProtocolError::ValueOutOfRange(format!(
            "{other:#04x} is not a boolean"
        ))),
    }
}

/// Fail with `TruncatedInput` unless `needed` bytes remain in `buf`.
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        Err(ProtocolError::truncated(needed, buf.remaining()))
    } else {
        Ok(())
    }
}

/// A fixed-width scalar value together with its declared type.
///
/// Doubles compare by bit pattern, matching their wire form: `NaN` equals
/// itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Copy)]
pub enum Primitive {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        use Primitive::*;
        match (*self, *other) {
            (Bool(a), Bool(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (UInt8(a), UInt8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Primitive {}

impl Primitive {
    /// Build an integer primitive of type `tag`, failing when `value` does
    /// not fit that type.
    pub fn from_int(tag: TypeTag, value: i128) -> Result<Self> {
        let format = int_format(tag).ok_or_else(|| {
            ProtocolError::ValueOutOfRange(format!("{tag:?} is not an integer type"))
        })?;
        if value < format.min() || value > format.max() {
            return Err(ProtocolError::ValueOutOfRange(format!(
                "{value} does not fit in {tag:?}"
            )));
        }
        Ok(match tag {
            TypeTag::Int8 => Primitive::Int8(value as i8),
            TypeTag::UInt8 => Primitive::UInt8(value as u8),
            TypeTag::Int16 => Primitive::Int16(value as i16),
            TypeTag::UInt16 => Primitive::UInt16(value as u16),
            TypeTag::Int32 => Primitive::Int32(value as i32),
            TypeTag::UInt32 => Primitive::UInt32(value as u32),
            TypeTag::Int64 => Primitive::Int64(value as i64),
            _ => Primitive::UInt64(value as u64),
        })
    }

    /// Type tag this value is written with
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Primitive::Bool(_) => TypeTag::Bool,
            Primitive::Int8(_) => TypeTag::Int8,
            Primitive::UInt8(_) => TypeTag::UInt8,
            Primitive::Int16(_) => TypeTag::Int16,
            Primitive::UInt16(_) => TypeTag::UInt16,
            Primitive::Int32(_) => TypeTag::Int32,
            Primitive::UInt32(_) => TypeTag::UInt32,
            Primitive::Int64(_) => TypeTag::Int64,
            Primitive::UInt64(_) => TypeTag::UInt64,
            Primitive::Double(_) => TypeTag::Double,
        }
    }

    /// Integer value widened to `i128`, `None` for bools and doubles
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Primitive::Int8(v) => Some(v.into()),
            Primitive::UInt8(v) => Some(v.into()),
            Primitive::Int16(v) => Some(v.into()),
            Primitive::UInt16(v) => Some(v.into()),
            Primitive::Int32(v) => Some(v.into()),
            Primitive::UInt32(v) => Some(v.into()),
            Primitive::Int64(v) => Some(v.into()),
            Primitive::UInt64(v) => Some(v.into()),
            Primitive::Bool(_) | Primitive::Double(_) => None,
        }
    }

    /// Write the fixed-width little-endian representation (no type tag)
    pub fn encode<B: BufMut>(&self, out: &mut B) -> Result<()> {
        match *self {
            Primitive::Bool(v) => {
                encode_bool(v, out);
                Ok(())
            }
            Primitive::Double(v) => {
                out.put_f64_le(v);
                Ok(())
            }
            _ => {
                let tag = self.type_tag();
                let value = self.as_i128().unwrap_or_default();
                match int_format(tag) {
                    Some(format) => encode_int(value, format, out),
                    None => Err(ProtocolError::UnknownType(tag as u8)),
                }
            }
        }
    }

    /// Read one value of type `tag`, or `None` when `tag` is not fixed-width
    pub fn decode<B: Buf>(tag: TypeTag, buf: &mut B) -> Result<Option<Self>> {
        let value = match tag {
            TypeTag::Bool => Primitive::Bool(decode_bool(buf)?),
            TypeTag::Double => {
                ensure_remaining(buf, 8)?;
                Primitive::Double(buf.get_f64_le())
            }
            TypeTag::String | TypeTag::Object => return Ok(None),
            _ => match int_format(tag) {
                Some(format) => Primitive::from_int(tag, decode_int(buf, format)?)?,
                None => return Ok(None),
            },
        };
        Ok(Some(value))
    }
}

/// Wire format of an integer type tag
pub fn int_format(tag: TypeTag) -> Option<IntFormat> {
    match tag {
        TypeTag::Int8 => Some(IntFormat::I8),
        TypeTag::UInt8 => Some(IntFormat::U8),
        TypeTag::Int16 => Some(IntFormat::I16),
        TypeTag::UInt16 => Some(IntFormat::U16),
        TypeTag::Int32 => Some(IntFormat::I32),
        TypeTag::UInt32 => Some(IntFormat::U32),
        TypeTag::Int64 => Some(IntFormat::I64),
        TypeTag::UInt64 => Some(IntFormat::U64),
        _ => None,
    }
}
