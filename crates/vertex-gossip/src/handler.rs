//! Callback traits a caller registers with a [`crate::GossipTransport`]
//! to react to newly-seen blocks and state updates, and to answer
//! parent-block requests from local storage.
//!
//! Registration must happen before the transport starts relaying
//! (spec.md §5: "registration must be before `start()` or externally
//! synchronized"); these lists are append-only for the transport's
//! lifetime.

use vertex_types::{Block, Hash, MachineId};

/// Invoked the first time a given block hash is seen, whether it
/// arrived over the wire or was produced locally (spec.md §4.9: local
/// production is delivered through the same handler path "so local
/// and remote deliveries are indistinguishable").
pub trait BlockHandler<C>: Send + Sync {
    /// Applies `block` to local state.
    fn on_block(&self, block: &Block<C>);
}

/// Invoked on a `STATE_UPDATE` envelope, out of band of any block.
pub trait StateHandler: Send + Sync {
    /// Records that `machine_id` self-reports `state_root`.
    fn on_state_update(&self, machine_id: &MachineId, state_root: Hash);
}

/// Answers a `REQUEST_BLOCK` by looking a hash up in local storage.
pub trait BlockRequestHandler<C>: Send + Sync {
    /// Returns the block with digest `hash`, if locally known.
    fn block_by_hash(&self, hash: &Hash) -> Option<Block<C>>;
}

impl<C, F> BlockHandler<C> for F
where
    F: Fn(&Block<C>) + Send + Sync,
{
    fn on_block(&self, block: &Block<C>) {
        self(block)
    }
}

impl<F> StateHandler for F
where
    F: Fn(&MachineId, Hash) + Send + Sync,
{
    fn on_state_update(&self, machine_id: &MachineId, state_root: Hash) {
        self(machine_id, state_root)
    }
}

impl<C, F> BlockRequestHandler<C> for F
where
    F: Fn(&Hash) -> Option<Block<C>> + Send + Sync,
{
    fn block_by_hash(&self, hash: &Hash) -> Option<Block<C>> {
        self(hash)
    }
}
