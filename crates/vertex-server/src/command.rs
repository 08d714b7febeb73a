//! The command set a `ServerMachine` accepts, and the bus events it emits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vertex_bus::Topic;
use vertex_types::canonical::canonicalize_map;
use vertex_types::{Amount, Canonicalize, Hash, MachineId};

/// Commands recognized by a `ServerMachine`.
///
/// `UpdateChildState` and `SyncChildStates` are applied immediately,
/// bypassing the mempool (they are administrative corrections to
/// already-known child roots, not events that need to survive a
/// produce/verify round). Every other variant is appended to the
/// mempool with a default gas price and a per-sender nonce like any
/// other submachine command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerCommand {
    /// Registers a freshly created signer as a child of this server.
    CreateSigner {
        /// The new signer's machine id.
        signer_id: MachineId,
    },
    /// Records that `child_id` produced a new block, advancing this
    /// server's last-known root for it.
    ProcessBlock {
        /// The child submachine that produced the block.
        child_id: MachineId,
        /// The block's digest.
        block_hash: Hash,
    },
    /// A child's response to a `SYNC_STATE` query, carrying its
    /// self-reported current state root.
    SyncState {
        /// The responding child.
        child_id: MachineId,
        /// The root the child reports for itself.
        reported_state_root: Hash,
    },
    /// Bulk-overwrites this server's last-known root for several
    /// children at once. Applied immediately.
    SyncChildStates {
        /// Child id to newly-known root.
        updates: BTreeMap<MachineId, Hash>,
    },
    /// Overwrites this server's last-known root for a single child.
    /// Applied immediately.
    UpdateChildState {
        /// The child being updated.
        child_id: MachineId,
        /// The new root to record.
        state_root: Hash,
    },
    /// Moves `amount` from `from`'s to `to`'s ledger entry in this
    /// server's opaque data bag. Carried but not balance-enforced, the
    /// same treatment gas metering gets at this layer — entity- and
    /// channel-level transfers are the ones under conservation
    /// invariants.
    Transfer {
        /// The debited account.
        from: MachineId,
        /// The credited account.
        to: MachineId,
        /// The amount moved.
        amount: Amount,
    },
}

impl Canonicalize for ServerCommand {
    fn canonicalize(&self) -> Vec<u8> {
        match self {
            Self::CreateSigner { signer_id } => {
                let mut out = vec![0u8];
                out.extend(signer_id.canonicalize());
                out
            }
            Self::ProcessBlock { child_id, block_hash } => {
                let mut out = vec![1u8];
                out.extend(child_id.canonicalize());
                out.extend(block_hash.canonicalize());
                out
            }
            Self::SyncState {
                child_id,
                reported_state_root,
            } => {
                let mut out = vec![2u8];
                out.extend(child_id.canonicalize());
                out.extend(reported_state_root.canonicalize());
                out
            }
            Self::SyncChildStates { updates } => {
                let mut out = vec![3u8];
                out.extend(canonicalize_map(
                    updates.iter().map(|(k, v)| (k.clone(), *v)),
                ));
                out
            }
            Self::UpdateChildState { child_id, state_root } => {
                let mut out = vec![4u8];
                out.extend(child_id.canonicalize());
                out.extend(state_root.canonicalize());
                out
            }
            Self::Transfer { from, to, amount } => {
                let mut out = vec![5u8];
                out.extend(from.canonicalize());
                out.extend(to.canonicalize());
                out.extend(amount.canonicalize());
                out
            }
        }
    }
}

impl Topic for ServerCommand {
    fn topic(&self) -> &'static str {
        match self {
            Self::CreateSigner { .. } => "CREATE_SIGNER",
            Self::ProcessBlock { .. } => "PROCESS_BLOCK",
            Self::SyncState { .. } => "SYNC_STATE",
            Self::SyncChildStates { .. } => "SYNC_CHILD_STATES",
            Self::UpdateChildState { .. } => "UPDATE_CHILD_STATE",
            Self::Transfer { .. } => "TRANSFER",
        }
    }
}

/// Events a `ServerMachine` broadcasts as children register, sync, or
/// its own chain advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    /// A new child was registered.
    ChildRegistered {
        /// The registered child.
        child_id: MachineId,
    },
    /// A child's last-known root changed.
    ChildStateUpdated {
        /// The updated child.
        child_id: MachineId,
        /// Its new last-known root.
        state_root: Hash,
    },
    /// A value transfer was recorded.
    TransferApplied {
        /// The debited account.
        from: MachineId,
        /// The credited account.
        to: MachineId,
        /// The amount moved.
        amount: Amount,
    },
}

impl Topic for ServerEvent {
    fn topic(&self) -> &'static str {
        match self {
            Self::ChildRegistered { .. } => "CHILD_REGISTERED",
            Self::ChildStateUpdated { .. } => "CHILD_STATE_UPDATED",
            Self::TransferApplied { .. } => "TRANSFER_APPLIED",
        }
    }
}

/// Structured lifecycle events broadcast over
/// [`crate::machine::ServerMachine::subscribe_consensus_events`],
/// mirroring the produce/verify/commit points of the block pipeline so
/// a dashboard or test can observe them without polling state.
#[derive(Debug, Clone)]
pub enum ConsensusEvent {
    /// A block was produced locally and is about to be broadcast.
    BlockProposed {
        /// The block's height.
        height: u64,
        /// The block's digest.
        id: Hash,
    },
    /// A block (local or received) was committed.
    BlockFinalized {
        /// The block's height.
        height: u64,
        /// The block's digest.
        id: Hash,
    },
    /// The committed state root changed.
    StateChanged {
        /// The new state root.
        state_root: Hash,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_child_state_canonicalizes_deterministically() {
        let cmd = ServerCommand::UpdateChildState {
            child_id: MachineId::new("signer-1"),
            state_root: Hash::digest(b"root"),
        };
        assert_eq!(cmd.canonicalize(), cmd.canonicalize());
    }

    #[test]
    fn topic_names_match_spec_command_names() {
        assert_eq!(
            ServerCommand::CreateSigner {
                signer_id: MachineId::new("s")
            }
            .topic(),
            "CREATE_SIGNER"
        );
        assert_eq!(
            ServerCommand::Transfer {
                from: MachineId::new("a"),
                to: MachineId::new("b"),
                amount: Amount::new(1)
            }
            .topic(),
            "TRANSFER"
        );
    }
}
