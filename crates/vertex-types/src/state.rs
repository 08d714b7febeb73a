//! Base machine state, shared by every concrete machine kind, plus the
//! `Server` and `Signer` state extensions. `Entity` and `Channel`
//! extensions live in [`crate::entity`] and [`crate::channel`].

use crate::canonical::{canonicalize_map, Canonicalize};
use crate::hash::Hash;
use crate::machine_id::MachineId;
use crate::signed_transaction::SignedTransaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State shared by every machine kind: block height, the digest of the
/// latest block, the current state root, an opaque free-form data bag,
/// per-sender nonces, and hierarchy linkage (parent id, child ids).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaseMachineState {
    /// Height of the latest appended block.
    pub block_height: u64,
    /// Digest of the latest appended block.
    pub latest_hash: Hash,
    /// Current canonical state root.
    pub state_root: Hash,
    /// Opaque, machine-kind-specific data.
    pub data: BTreeMap<String, serde_json::Value>,
    /// Per-sender nonce, monotonically increasing.
    pub nonces: BTreeMap<MachineId, u64>,
    /// The machine that created this machine, if any.
    pub parent_id: Option<MachineId>,
    /// Submachines created under this machine, in creation order.
    pub child_ids: Vec<MachineId>,
}

impl Canonicalize for serde_json::Value {
    fn canonicalize(&self) -> Vec<u8> {
        // serde_json::Value has no native total order for objects; go
        // through its canonical string form, which the `data` bag
        // already treats as opaque from every machine's perspective.
        self.to_string().canonicalize()
    }
}

impl Canonicalize for BaseMachineState {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.block_height.canonicalize());
        out.extend(self.latest_hash.canonicalize());
        out.extend(self.state_root.canonicalize());
        out.extend(canonicalize_map(
            self.data.iter().map(|(k, v)| (k.clone(), v.clone())),
        ));
        out.extend(canonicalize_map(
            self.nonces.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(self.parent_id.clone().canonicalize());
        out.extend(self.child_ids.canonicalize());
        out
    }
}

/// Top-of-hierarchy state: the base state plus each child's last-known
/// state root and the server's own timers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerState {
    /// Shared base state.
    pub base: BaseMachineState,
    /// Last-known state root for each registered child.
    pub submachines: BTreeMap<MachineId, Hash>,
    /// Unix milliseconds of the last produced block.
    pub last_block_time: i64,
    /// Unix milliseconds of the last child-sync broadcast.
    pub last_sync_time: i64,
}

impl Canonicalize for ServerState {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = self.base.canonicalize();
        out.extend(canonicalize_map(
            self.submachines.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(self.last_block_time.canonicalize());
        out.extend(self.last_sync_time.canonicalize());
        out
    }
}

/// Single-key participant state: the base state plus the signer's own
/// public key and the transactions it has partially signed so far.
///
/// `C` is the transaction payload type the signer co-signs, generally
/// an `EntityCommand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerState<C> {
    /// Shared base state.
    pub base: BaseMachineState,
    /// Hex-encoded compressed secp256k1 public key (66 hex chars).
    pub public_key: String,
    /// Transactions awaiting or collecting partial signatures, keyed
    /// by `H(canonical(transaction))`.
    pub pending_transactions: BTreeMap<Hash, SignedTransaction<C>>,
}

impl<C> Default for SignerState<C> {
    fn default() -> Self {
        Self {
            base: BaseMachineState::default(),
            public_key: String::new(),
            pending_transactions: BTreeMap::new(),
        }
    }
}

impl<C: Canonicalize> Canonicalize for SignerState<C>
where
    crate::message::Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = self.base.canonicalize();
        out.extend(self.public_key.canonicalize());
        out.extend(canonicalize_map(
            self.pending_transactions
                .iter()
                .map(|(k, v)| (*k, v.clone())),
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_state_is_genesis() {
        let state = BaseMachineState::default();
        assert_eq!(state.block_height, 0);
        assert_eq!(state.latest_hash, Hash::GENESIS);
    }

    #[test]
    fn base_state_canonicalization_is_deterministic() {
        let state = BaseMachineState::default();
        assert_eq!(state.canonicalize(), BaseMachineState::default().canonicalize());
    }
}
