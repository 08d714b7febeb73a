//! Errors surfaced by [`crate::MachineCore`]'s block pipeline.

use vertex_types::Hash;

/// A rejected block, transaction, or replay.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// `produce_block` was called with an empty mempool.
    #[error("mempool has no pending transactions to propose")]
    NoTransactions,
    /// A block's `parent_hash` does not equal the current chain head.
    #[error("block parent hash {actual} does not link to current head {expected}")]
    LinkMismatch {
        /// The current chain head.
        expected: Hash,
        /// The block's claimed parent.
        actual: Hash,
    },
    /// A block's height does not immediately follow the current height.
    #[error("block height {actual} does not follow current height (expected {expected})")]
    HeightMismatch {
        /// `current_height + 1`.
        expected: u64,
        /// The block's claimed height.
        actual: u64,
    },
    /// A block's `transactions_root` does not match its transaction list.
    #[error("transactions root mismatch: header claims {expected}, recomputed {actual}")]
    TransactionsRootMismatch {
        /// The header's claimed root.
        expected: Hash,
        /// The root recomputed from the transaction list.
        actual: Hash,
    },
    /// A block's `state_root` does not match the state obtained by
    /// applying its transactions to the prior state.
    #[error("state root mismatch: header claims {expected}, recomputed {actual}")]
    StateRootMismatch {
        /// The header's claimed root.
        expected: Hash,
        /// The root recomputed by replaying the block.
        actual: Hash,
    },
    /// Applying a block's transactions to machine state failed.
    #[error("applying block transactions failed: {0}")]
    ApplyFailed(String),
    /// The mempool is already at `max_size`.
    #[error("mempool is full ({current}/{max})")]
    MempoolFull {
        /// Current combined pending+processing size.
        current: usize,
        /// The mempool's capacity.
        max: usize,
    },
    /// A replay requested a block height the journal has no record of.
    #[error("missing block at height {0}")]
    MissingBlock(u64),
    /// The underlying blob store failed.
    #[error("storage error: {0}")]
    Storage(#[from] vertex_storage::StorageError),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, MachineError>;
