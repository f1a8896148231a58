//! Key/value persistence used for templates and per-environment records.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer key/value store addressed by string keys
pub trait KeyValueStore {
    fn get_int(&self, key: &str, default: i32) -> i32;

    fn set_int(&mut self, key: &str, value: i32);

    fn has_key(&self, key: &str) -> bool;

    /// Remove every key starting with `prefix`, returning how many were removed
    fn remove_all_by_prefix(&mut self, prefix: &str) -> usize;
}

/// In-memory store, serializable as a whole
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<String, i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), value);
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn remove_all_by_prefix(&mut self, prefix: &str) -> usize {
        let before = self.values.len();
        self.values.retain(|key, _| !key.starts_with(prefix));
        before - self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default() {
        let store = MemoryStore::new();
        assert_eq!(store.get_int("missing", 7), 7);
        assert!(!store.has_key("missing"));
    }

    #[test]
    fn test_set_and_get() {
        let mut store = MemoryStore::new();
        store.set_int("a", 3);
        store.set_int("a", 4);
        assert_eq!(store.get_int("a", 0), 4);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_by_prefix() {
        let mut store = MemoryStore::new();
        store.set_int("env.pond.runs", 1);
        store.set_int("env.pond.best", 9);
        store.set_int("env.lake.runs", 2);

        assert_eq!(store.remove_all_by_prefix("env.pond."), 2);
        assert_eq!(store.get_int("env.lake.runs", 0), 2);
        assert!(!store.has_key("env.pond.best"));
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut store = MemoryStore::new();
        store.set_int("template.0.id", 12);
        let bytes = store.to_bytes().unwrap();
        let restored = MemoryStore::from_bytes(&bytes).unwrap();
        assert_eq!(store, restored);
    }
}
