//! The in-memory knowledge base: unique topic keys in insertion order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One topic and the guidance text attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: String,
    pub value: String,
}

/// Insertion-ordered map of topic key → guidance text.
///
/// Re-inserting an existing key replaces its value but keeps its original
/// position, so ranking ties stay stable across reloads.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    positions: HashMap<String, usize>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();

        if let Some(&pos) = self.positions.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].value, value));
        }

        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push(KnowledgeEntry { key, value });
        None
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&pos| self.entries[pos].value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KnowledgeEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn into_entries(self) -> Vec<KnowledgeEntry> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KnowledgeBase {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut base = KnowledgeBase::new();
        for (k, v) in iter {
            base.insert(k, v);
        }
        base
    }
}

impl<'a> IntoIterator for &'a KnowledgeBase {
    type Item = &'a KnowledgeEntry;
    type IntoIter = std::slice::Iter<'a, KnowledgeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let kb: KnowledgeBase = [("sleep", "a"), ("anxiety", "b"), ("grief", "c")]
            .into_iter()
            .collect();
        assert_eq!(kb.keys().collect::<Vec<_>>(), vec!["sleep", "anxiety", "grief"]);
    }

    #[test]
    fn reinsert_replaces_value_in_place() {
        let mut kb = KnowledgeBase::new();
        kb.insert("sleep", "old");
        kb.insert("stress", "breathe");
        let previous = kb.insert("sleep", "new");

        assert_eq!(previous.as_deref(), Some("old"));
        assert_eq!(kb.len(), 2);
        assert_eq!(kb.get("sleep"), Some("new"));
        assert_eq!(kb.keys().next(), Some("sleep"));
    }

    #[test]
    fn empty_base() {
        let kb = KnowledgeBase::new();
        assert!(kb.is_empty());
        assert_eq!(kb.get("anything"), None);
    }
}
