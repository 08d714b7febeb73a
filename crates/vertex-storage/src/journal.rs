//! Typed convenience layer over [`BlobStore`] for storing blocks and
//! state snapshots per machine, with a height index so
//! `get_block_by_number`/`get_latest_block`/`get_block_range` don't
//! need a backend-level scan.
//!
//! Mutable snapshots (one per machine, overwritten on every commit)
//! live under [`keys::mutable_snapshot_key`]; immutable snapshots (one
//! per accepted block) live under their content-hash key
//! ([`keys::state_key`]), matching the external-interfaces contract.

use crate::keys::{block_key, height_index_key, latest_height_key, mutable_snapshot_key, state_key};
use crate::{BlobStore, Result, StorageError};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use vertex_types::{Hash, MachineId};

/// Stores and retrieves blocks and state snapshots for one machine
/// hierarchy, routed through a shared [`BlobStore`].
pub struct BlockJournal {
    store: Arc<dyn BlobStore>,
}

impl BlockJournal {
    /// Wraps a shared blob store.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Persists `block` under its content-hash key and records it in
    /// `machine_id`'s height index, advancing the latest-height marker
    /// if `height` is new.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn put_block<B: Serialize>(
        &self,
        machine_id: &MachineId,
        height: u64,
        hash: &Hash,
        block: &B,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(block).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(&block_key(hash), bytes)?;
        self.store.put(&height_index_key(machine_id, height), hash.to_hex().into_bytes())?;

        let advance = match self.latest_height(machine_id)? {
            Some(current) => height > current,
            None => true,
        };
        if advance {
            self.store
                .put(&latest_height_key(machine_id), height.to_string().into_bytes())?;
        }
        Ok(())
    }

    /// Fetches a block by its content hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes fail to deserialize.
    pub fn get_block<B: DeserializeOwned>(&self, hash: &Hash) -> Result<Option<B>> {
        match self.store.get(&block_key(hash))? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }

    /// Returns whether a block with the given hash is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        self.store.contains(&block_key(hash))
    }

    /// Fetches the block at `height` for `machine_id`, if recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or block fails to read/deserialize.
    pub fn get_block_by_number<B: DeserializeOwned>(
        &self,
        machine_id: &MachineId,
        height: u64,
    ) -> Result<Option<B>> {
        match self.store.get(&height_index_key(machine_id, height))? {
            None => Ok(None),
            Some(hash_bytes) => {
                let hash = parse_hash(&hash_bytes)?;
                self.get_block(&hash)
            }
        }
    }

    /// Fetches the highest-height block recorded for `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or block fails to read/deserialize.
    pub fn get_latest_block<B: DeserializeOwned>(&self, machine_id: &MachineId) -> Result<Option<B>> {
        match self.latest_height(machine_id)? {
            None => Ok(None),
            Some(height) => self.get_block_by_number(machine_id, height),
        }
    }

    /// Fetches every block in `[from, to]` (inclusive) recorded for
    /// `machine_id`, skipping any height with no recorded block.
    ///
    /// # Errors
    ///
    /// Returns an error if any recorded block fails to read/deserialize.
    pub fn get_block_range<B: DeserializeOwned>(
        &self,
        machine_id: &MachineId,
        from: u64,
        to: u64,
    ) -> Result<Vec<B>> {
        let mut out = Vec::new();
        for height in from..=to {
            if let Some(block) = self.get_block_by_number(machine_id, height)? {
                out.push(block);
            }
        }
        Ok(out)
    }

    /// Returns the highest height recorded for `machine_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read or the stored
    /// marker is not a valid integer.
    pub fn latest_height(&self, machine_id: &MachineId) -> Result<Option<u64>> {
        match self.store.get(&latest_height_key(machine_id))? {
            None => Ok(None),
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                text.parse()
                    .map(Some)
                    .map_err(|e: std::num::ParseIntError| StorageError::Serialization(e.to_string()))
            }
        }
    }

    /// Overwrites `machine_id`'s mutable state snapshot (the live,
    /// deterministic-key snapshot updated on every commit).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn put_mutable_snapshot<S: Serialize>(&self, machine_id: &MachineId, state: &S) -> Result<()> {
        let bytes = serde_json::to_vec(state).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(&mutable_snapshot_key(machine_id), bytes)
    }

    /// Fetches `machine_id`'s mutable state snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes fail to deserialize.
    pub fn get_mutable_snapshot<S: DeserializeOwned>(&self, machine_id: &MachineId) -> Result<Option<S>> {
        match self.store.get(&mutable_snapshot_key(machine_id))? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }

    /// Stores an immutable state snapshot under its content-hash key.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn put_immutable_snapshot<S: Serialize>(&self, hash: &Hash, state: &S) -> Result<()> {
        let bytes = serde_json::to_vec(state).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.put(&state_key(hash), bytes)
    }

    /// Fetches an immutable state snapshot by its content hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes fail to deserialize.
    pub fn get_immutable_snapshot<S: DeserializeOwned>(&self, hash: &Hash) -> Result<Option<S>> {
        match self.store.get(&state_key(hash))? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }
}

fn parse_hash(bytes: &[u8]) -> Result<Hash> {
    let text = std::str::from_utf8(bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Hash::from_hex(text).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        n: u64,
    }

    fn journal() -> BlockJournal {
        BlockJournal::new(Arc::new(MemoryBlobStore::new()))
    }

    #[test]
    fn block_round_trips_by_hash_and_height() {
        let j = journal();
        let machine = MachineId::new("server-1");
        let hash = Hash::digest(b"block-0");
        j.put_block(&machine, 0, &hash, &Dummy { n: 0 }).unwrap();

        let by_hash: Dummy = j.get_block(&hash).unwrap().unwrap();
        assert_eq!(by_hash, Dummy { n: 0 });

        let by_height: Dummy = j.get_block_by_number(&machine, 0).unwrap().unwrap();
        assert_eq!(by_height, Dummy { n: 0 });

        let latest: Dummy = j.get_latest_block(&machine).unwrap().unwrap();
        assert_eq!(latest, Dummy { n: 0 });
    }

    #[test]
    fn latest_height_tracks_the_highest_height_seen() {
        let j = journal();
        let machine = MachineId::new("server-1");
        j.put_block(&machine, 0, &Hash::digest(b"b0"), &Dummy { n: 0 })
            .unwrap();
        j.put_block(&machine, 1, &Hash::digest(b"b1"), &Dummy { n: 1 })
            .unwrap();
        assert_eq!(j.latest_height(&machine).unwrap(), Some(1));

        let latest: Dummy = j.get_latest_block(&machine).unwrap().unwrap();
        assert_eq!(latest, Dummy { n: 1 });
    }

    #[test]
    fn block_range_skips_unrecorded_heights() {
        let j = journal();
        let machine = MachineId::new("server-1");
        j.put_block(&machine, 0, &Hash::digest(b"b0"), &Dummy { n: 0 })
            .unwrap();
        j.put_block(&machine, 2, &Hash::digest(b"b2"), &Dummy { n: 2 })
            .unwrap();

        let range: Vec<Dummy> = j.get_block_range(&machine, 0, 2).unwrap();
        assert_eq!(range, vec![Dummy { n: 0 }, Dummy { n: 2 }]);
    }

    #[test]
    fn mutable_snapshot_is_overwritten_in_place() {
        let j = journal();
        let machine = MachineId::new("entity-1");
        j.put_mutable_snapshot(&machine, &Dummy { n: 1 }).unwrap();
        j.put_mutable_snapshot(&machine, &Dummy { n: 2 }).unwrap();
        let snap: Dummy = j.get_mutable_snapshot(&machine).unwrap().unwrap();
        assert_eq!(snap, Dummy { n: 2 });
    }

    #[test]
    fn immutable_snapshot_is_content_addressed() {
        let j = journal();
        let hash = Hash::digest(b"state-x");
        j.put_immutable_snapshot(&hash, &Dummy { n: 7 }).unwrap();
        let snap: Dummy = j.get_immutable_snapshot(&hash).unwrap().unwrap();
        assert_eq!(snap, Dummy { n: 7 });
    }
}
