//! # Value Model
//!
//! The closed set of values a portable-storage entry can hold.
//!
//! An [`Entry`] is a scalar, a nested [`Section`] or a homogeneous [`Array`].
//! The type tag written for a value always comes from its stored variant, so
//! an entry decoded from the wire encodes back to the exact same tag.

use crate::core::primitive::Primitive;
use crate::core::section::Section;
use crate::error::{constants, ProtocolError, Result};
use bytes::Bytes;
use std::fmt;
use std::ops::Deref;

/// Flag OR'd onto an element tag to mark a homogeneous array.
pub const ARRAY_FLAG: u8 = 0x80;

/// Legacy wrapper tag: the real (flagged) element tag follows it.
pub const ARRAY_WRAPPER: u8 = 13;

/// One-byte type discriminator preceding every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Int64 = 1,
    Int32 = 2,
    Int16 = 3,
    Int8 = 4,
    UInt64 = 5,
    UInt32 = 6,
    UInt16 = 7,
    UInt8 = 8,
    Double = 9,
    String = 10,
    Bool = 11,
    Object = 12,
}

impl TypeTag {
    /// Raw tag byte
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Tag byte with the array flag set
    pub const fn array_tag(self) -> u8 {
        self as u8 | ARRAY_FLAG
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            1 => TypeTag::Int64,
            2 => TypeTag::Int32,
            3 => TypeTag::Int16,
            4 => TypeTag::Int8,
            5 => TypeTag::UInt64,
            6 => TypeTag::UInt32,
            7 => TypeTag::UInt16,
            8 => TypeTag::UInt8,
            9 => TypeTag::Double,
            10 => TypeTag::String,
            11 => TypeTag::Bool,
            12 => TypeTag::Object,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }
}

/// Length-carrying raw bytes. Used both for text and for opaque blobs such as
/// hashes and network ids; no encoding is assumed.
#[derive(Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ByteString(Bytes);

impl ByteString {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Borrow as UTF-8 text when the bytes are valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for ByteString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) if text.chars().all(|c| !c.is_control()) => write!(f, "{text:?}"),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

impl From<&str> for ByteString {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for ByteString {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&[u8]> for ByteString {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(b: Vec<u8>) -> Self {
        Self(Bytes::from(b))
    }
}

impl From<Bytes> for ByteString {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl<const N: usize> From<[u8; N]> for ByteString {
    fn from(b: [u8; N]) -> Self {
        Self(Bytes::copy_from_slice(&b))
    }
}

/// A leaf value: fixed-width primitive or byte string.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Primitive(Primitive),
    String(ByteString),
}

impl Scalar {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Scalar::Primitive(p) => p.type_tag(),
            Scalar::String(_) => TypeTag::String,
        }
    }
}

/// Homogeneous sequence of entries sharing one element type.
///
/// Elements are scalars or sections; arrays of arrays cannot be built.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    element: TypeTag,
    items: Vec<Entry>,
}

impl Array {
    /// Empty array of `element` values
    pub fn new(element: TypeTag) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }

    /// Array from pre-built items, all of which must carry `element`
    pub fn with_items(element: TypeTag, items: Vec<Entry>) -> Result<Self> {
        for item in &items {
            check_element(element, item)?;
        }
        Ok(Self { element, items })
    }

    /// Append an item, rejecting nested arrays and mismatched types
    pub fn push(&mut self, item: impl Into<Entry>) -> Result<()> {
        let item = item.into();
        check_element(self.element, &item)?;
        self.items.push(item);
        Ok(())
    }

    pub fn element_type(&self) -> TypeTag {
        self.element
    }

    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.items.iter()
    }

    /// Iterate over the sections of an object array
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.items.iter().filter_map(Entry::as_section)
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn check_element(element: TypeTag, item: &Entry) -> Result<()> {
    match item.value_tag() {
        None => Err(ProtocolError::MalformedArray(
            constants::ERR_NESTED_ARRAY.to_string(),
        )),
        Some(tag) if tag != element => Err(ProtocolError::MalformedArray(format!(
            "{}: expected {element:?}, found {tag:?}",
            constants::ERR_MIXED_ARRAY
        ))),
        Some(_) => Ok(()),
    }
}

/// A value stored under a name inside a [`Section`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Scalar(Scalar),
    Object(Section),
    Array(Array),
}

impl Entry {
    /// Tag of a single (non-array) value, `None` for arrays
    pub fn value_tag(&self) -> Option<TypeTag> {
        match self {
            Entry::Scalar(s) => Some(s.type_tag()),
            Entry::Object(_) => Some(TypeTag::Object),
            Entry::Array(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Entry::Object(section) => Some(section),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Entry::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Entry::Scalar(Scalar::Primitive(p)) => Some(p),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&ByteString> {
        match self {
            Entry::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant that fits in `u64`
    pub fn as_u64(&self) -> Option<u64> {
        self.as_primitive()?
            .as_i128()
            .and_then(|v| u64::try_from(v).ok())
    }

    /// Any integer variant that fits in `i64`
    pub fn as_i64(&self) -> Option<i64> {
        self.as_primitive()?
            .as_i128()
            .and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_primitive()? {
            Primitive::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_primitive()? {
            Primitive::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Primitive> for Entry {
    fn from(p: Primitive) -> Self {
        Entry::Scalar(Scalar::Primitive(p))
    }
}

impl From<ByteString> for Entry {
    fn from(s: ByteString) -> Self {
        Entry::Scalar(Scalar::String(s))
    }
}

impl From<&str> for Entry {
    fn from(s: &str) -> Self {
        Entry::Scalar(Scalar::String(s.into()))
    }
}

impl From<String> for Entry {
    fn from(s: String) -> Self {
        Entry::Scalar(Scalar::String(s.into()))
    }
}

impl From<Section> for Entry {
    fn from(s: Section) -> Self {
        Entry::Object(s)
    }
}

impl From<Array> for Entry {
    fn from(a: Array) -> Self {
        Entry::Array(a)
    }
}

macro_rules! entry_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Entry {
                fn from(v: $ty) -> Self {
                    Entry::Scalar(Scalar::Primitive(Primitive::$variant(v)))
                }
            }
        )*
    };
}

entry_from_primitive! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
}
