//! # Section
//!
//! Ordered name-to-entry container, the root and nested-object type of
//! portable storage.
//!
//! Insertion order is replayed verbatim by the writer. Replacing an existing
//! key keeps its original position.

use crate::core::value::{ByteString, Entry};

/// Ordered mapping from field name to [`Entry`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    entries: Vec<(ByteString, Entry)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace `name`, returning the replaced entry
    pub fn insert(&mut self, name: impl Into<ByteString>, entry: impl Into<Entry>) -> Option<Entry> {
        let name = name.into();
        let entry = entry.into();
        match self.position(&name) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, entry)),
            None => {
                self.entries.push((name, entry));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<ByteString>, entry: impl Into<Entry>) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&Entry> {
        self.position(name.as_ref()).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, name: impl AsRef<[u8]>) -> Option<&mut Entry> {
        self.position(name.as_ref())
            .map(move |idx| &mut self.entries[idx].1)
    }

    /// Nested section stored under `name`
    pub fn section(&self, name: impl AsRef<[u8]>) -> Option<&Section> {
        self.get(name).and_then(Entry::as_section)
    }

    /// Follow a chain of object names, returning the entry at the end
    pub fn get_path(&self, path: &[&str]) -> Option<&Entry> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for name in parents {
            current = current.section(name)?;
        }
        current.get(last)
    }

    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Entry> {
        self.position(name.as_ref())
            .map(|idx| self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, name: impl AsRef<[u8]>) -> bool {
        self.position(name.as_ref()).is_some()
    }

    /// Entry count, written as the on-wire count prefix
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ByteString, &Entry)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ByteString> {
        self.entries.iter().map(|(k, _)| k)
    }

    fn position(&self, name: &[u8]) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.as_bytes() == name)
    }
}

impl<K, V> FromIterator<(K, V)> for Section
where
    K: Into<ByteString>,
    V: Into<Entry>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut section = Section::new();
        for (k, v) in iter {
            section.insert(k, v);
        }
        section
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let section = Section::new()
            .with("zeta", 1u8)
            .with("alpha", 2u8)
            .with("mid", 3u8);
        let keys: Vec<_> = section.keys().map(|k| k.as_str().unwrap()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut section = Section::new().with("a", 1u8).with("b", 2u8);
        let old = section.insert("a", 9u32);
        assert_eq!(old, Some(Entry::from(1u8)));
        assert_eq!(section.len(), 2);
        let keys: Vec<_> = section.keys().map(|k| k.as_str().unwrap()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(section.get("a"), Some(&Entry::from(9u32)));
    }

    #[test]
    fn test_get_path() {
        let addr = Section::new().with("m_port", 18080u16);
        let adr = Section::new().with("addr", addr);
        let peer = Section::new().with("adr", adr);

        let port = peer.get_path(&["adr", "addr", "m_port"]).unwrap();
        assert_eq!(port.as_u64(), Some(18080));
        assert!(peer.get_path(&["adr", "missing", "m_port"]).is_none());
        assert!(peer.get_path(&[]).is_none());
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = Section::new().with("x", 1u8).with("y", 2u8);
        let b = Section::new().with("y", 2u8).with("x", 1u8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_and_contains() {
        let mut section: Section = [("a", 1u8), ("b", 2u8)].into_iter().collect();
        assert!(section.contains_key("a"));
        assert_eq!(section.remove("a"), Some(Entry::from(1u8)));
        assert!(!section.contains_key("a"));
        assert!(section.remove("a").is_none());
    }
}
