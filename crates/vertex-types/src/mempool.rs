//! Mempool data types.
//!
//! These are plain value types; the actual drain/admit logic lives in
//! `vertex-machine`'s `MachineCore`, which is the only code allowed to
//! move an entry between `pending` and `processing`.

use crate::hash::Hash;
use crate::message::Message;
use std::collections::HashMap;

/// A pending transaction together with mempool bookkeeping.
///
/// `gas_price` and `nonce` are carried (per the system's non-goals,
/// gas is carried but never enforced) but `vertex-machine` never reads
/// `gas_price` for ordering purposes — proposal order is FIFO by
/// arrival.
#[derive(Debug, Clone)]
pub struct MempoolEntry<C> {
    /// The pending transaction.
    pub transaction: Message<C>,
    /// Unix milliseconds when the entry was admitted.
    pub received_at: i64,
    /// Nominal gas price, carried but unenforced.
    pub gas_price: u64,
    /// Per-sender nonce at admission time.
    pub nonce: u64,
}

/// The two-mapping mempool: every transaction lives in `pending` or
/// `processing`, never both.
///
/// Invariant: `current_size == pending.len() + processing.len() <= max_size`.
#[derive(Debug, Clone)]
pub struct MempoolState<C> {
    /// Transactions not yet drained into a block proposal.
    pub pending: HashMap<Hash, MempoolEntry<C>>,
    /// Transactions drained into an in-flight block proposal.
    pub processing: HashMap<Hash, MempoolEntry<C>>,
    /// Maximum combined size of `pending` and `processing`.
    pub max_size: usize,
}

impl<C> MempoolState<C> {
    /// Builds an empty mempool state with the given capacity.
    #[must_use]
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            pending: HashMap::new(),
            processing: HashMap::new(),
            max_size,
        }
    }

    /// Returns `pending.len() + processing.len()`.
    #[must_use]
    pub fn current_size(&self) -> usize {
        self.pending.len() + self.processing.len()
    }

    /// Returns whether the two-mapping invariant holds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.current_size() <= self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mempool_is_consistent() {
        let state: MempoolState<u64> = MempoolState::with_capacity(10);
        assert_eq!(state.current_size(), 0);
        assert!(state.is_consistent());
    }
}
