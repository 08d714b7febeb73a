//! Optional RocksDB-backed [`BlobStore`], gated behind the
//! `rocksdb-backend` feature.

use crate::{BlobStore, Result, StorageError};
use rocksdb::{Options, DB};
use std::path::Path;

/// A [`rocksdb`]-backed [`BlobStore`] for durable, on-disk persistence.
pub struct RocksDbBlobStore {
    db: DB,
}

impl RocksDbBlobStore {
    /// Opens (creating if absent) a RocksDB database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { db })
    }
}

impl BlobStore for RocksDbBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db
            .put(key.as_bytes(), value)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.contains(key)?;
        self.db
            .delete(key.as_bytes())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = RocksDbBlobStore::open(dir.path()).unwrap();
        store.put("k", vec![9, 9]).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(vec![9, 9]));
    }
}
