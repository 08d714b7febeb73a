//! Deterministic key schemes for the opaque blob store.
//!
//! Per the external-interfaces contract: blocks live under
//! `block:{hash}` (immutable, content-keyed) and state snapshots live
//! under `state:{hash}` (also content-keyed). [`crate::journal`] layers
//! a per-machine height index on top so `get_block_by_number` and
//! `get_latest_block` don't require a full scan.

use vertex_types::{Hash, MachineId};

/// The key a block is stored under: `block:{hash}`.
#[must_use]
pub fn block_key(hash: &Hash) -> String {
    format!("block:{}", hash.to_hex())
}

/// The key a state snapshot is stored under: `state:{hash}`.
#[must_use]
pub fn state_key(hash: &Hash) -> String {
    format!("state:{}", hash.to_hex())
}

/// The key mapping a `(machine, height)` pair to a block hash.
#[must_use]
pub fn height_index_key(machine_id: &MachineId, height: u64) -> String {
    format!("height:{machine_id}:{height:020}")
}

/// The key holding the latest known height for a machine.
#[must_use]
pub fn latest_height_key(machine_id: &MachineId) -> String {
    format!("latest:{machine_id}")
}

/// The key a machine's mutable state snapshot (the one overwritten on
/// every commit, as opposed to the immutable per-block snapshot) is
/// stored under.
#[must_use]
pub fn mutable_snapshot_key(machine_id: &MachineId) -> String {
    format!("snapshot:{machine_id}")
}
