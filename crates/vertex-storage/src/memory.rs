//! In-memory [`BlobStore`], the default backend used by tests and the
//! orchestrator.

use crate::{BlobStore, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A [`HashMap`]-backed [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Builds an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns whether the store has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.write().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = MemoryBlobStore::new();
        store.put("k", vec![1, 2, 3]).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn delete_reports_prior_presence() {
        let store = MemoryBlobStore::new();
        store.put("k", vec![1]).unwrap();
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
    }
}
