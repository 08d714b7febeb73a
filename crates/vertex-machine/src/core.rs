//! The shared produce/receive/verify block pipeline.
//!
//! `MachineCore<S, C>` is generic over a state type `S` (one of
//! `ServerState`, `SignerState<C>`, `EntityState<C>`) and the command
//! payload `C` it carries. It owns the mechanics every block-producing
//! submachine needs — mempool admission, block linkage, transaction
//! and state root computation — while leaving "what a transaction
//! does to state" to the caller's `apply` closure, since that is the
//! one part that genuinely differs between Server, Signer, and Entity.

use crate::error::{MachineError, Result};
use crate::hasbase::HasBase;
use std::collections::HashMap;
use tracing::{debug, instrument};
use vertex_storage::BlockJournal;
use vertex_types::{
    Block, BlockHeader, Canonicalize, Hash, MachineId, MempoolEntry, MempoolState, Message,
};

/// Replay starting point for [`MachineCore::reconstruct_state`].
pub enum ReplayMode<'a, S> {
    /// Replay every block from height 1 onward, starting from `genesis`.
    FromGenesis {
        /// The machine's state at height 0.
        genesis: &'a S,
    },
    /// Replay blocks after an already-known snapshot, skipping the
    /// (potentially large) prefix of history before it.
    FromSnapshot {
        /// The state as of `at_height`.
        state: &'a S,
        /// The height `state` was captured at.
        at_height: u64,
    },
}

/// The produce/receive/verify pipeline for one machine, parameterized
/// by its state type `S` and command payload `C`.
pub struct MachineCore<S, C> {
    /// This machine's own identifier, used as `BlockHeader::proposer`
    /// when it produces a block.
    pub self_id: MachineId,
    /// The machine's current committed state.
    pub state: S,
    /// Transactions awaiting or undergoing inclusion in a block.
    pub mempool: MempoolState<C>,
}

impl<S, C> MachineCore<S, C>
where
    S: HasBase + Clone,
{
    /// Builds a fresh core over `state`, with an empty mempool of the
    /// given capacity.
    #[must_use]
    pub fn new(self_id: MachineId, state: S, mempool_capacity: usize) -> Self {
        Self {
            self_id,
            state,
            mempool: MempoolState::with_capacity(mempool_capacity),
        }
    }

    /// Admits `transaction` into the pending mempool, assigning it the
    /// sender's next nonce.
    ///
    /// This only stamps the nonce onto the [`MempoolEntry`] for
    /// bookkeeping (ordering, diagnostics) — it never writes to
    /// `state.base.nonces`. That mapping is part of the canonical
    /// state (`vertex_types::BaseMachineState::nonces`), and `apply`
    /// is the only place allowed to advance it, so that a producer
    /// (which calls `admit` then `produce_block`) and a receiving peer
    /// (which only ever calls `receive_block`) end up with identical
    /// nonce maps and therefore identical `state_root`s.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::MempoolFull`] if the mempool is already
    /// at capacity.
    pub fn admit(&mut self, transaction: Message<C>, gas_price: u64, now: i64) -> Result<Hash>
    where
        C: Canonicalize,
        Message<C>: Canonicalize,
    {
        if self.mempool.current_size() >= self.mempool.max_size {
            return Err(MachineError::MempoolFull {
                current: self.mempool.current_size(),
                max: self.mempool.max_size,
            });
        }

        let digest = transaction.canonical_hash();
        let sender = transaction.sender.clone();
        let committed = self.state.base().nonces.get(&sender).copied().unwrap_or(0);
        let highest_queued = self
            .mempool
            .pending
            .values()
            .chain(self.mempool.processing.values())
            .filter(|entry| entry.transaction.sender == sender)
            .map(|entry| entry.nonce)
            .max()
            .unwrap_or(0);
        let nonce = committed.max(highest_queued) + 1;

        self.mempool.pending.insert(
            digest,
            MempoolEntry {
                transaction,
                received_at: now,
                gas_price,
                nonce,
            },
        );
        Ok(digest)
    }

    /// Produces a new block over up to `max_transactions` pending
    /// entries (oldest-arrival-first). Unlike [`MachineCore::verify_block`],
    /// each transaction is applied one at a time to the ephemeral
    /// state: one that `apply` rejects is simply dropped from the
    /// block (and from the mempool) rather than failing the whole
    /// batch, matching produce-mode's "skip, don't abort" semantics.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoTransactions`] if the mempool is
    /// empty, or if every drained transaction was rejected (nothing
    /// left to seal), in which case the whole batch is returned to
    /// `pending` unchanged.
    #[instrument(skip(self, apply, now), fields(machine_id = %self.self_id))]
    pub fn produce_block<F, E>(
        &mut self,
        proposer: MachineId,
        now: u64,
        max_transactions: usize,
        mut apply: F,
    ) -> Result<Block<C>>
    where
        C: Canonicalize + Clone,
        Message<C>: Canonicalize,
        F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        if self.mempool.pending.is_empty() {
            return Err(MachineError::NoTransactions);
        }

        let batch = drain_batch(&mut self.mempool.pending, max_transactions);
        for (hash, entry) in &batch {
            self.mempool.processing.insert(*hash, entry.clone());
        }
        let drained: Vec<Message<C>> = batch.iter().map(|(_, e)| e.transaction.clone()).collect();

        let new_height = self.state.base().block_height + 1;
        let parent_hash = self.state.base().latest_hash;

        let (ephemeral, transactions, state_root) =
            ephemeral_next_skipping(&self.state, new_height, drained, &mut apply);

        if transactions.is_empty() {
            for (hash, entry) in batch {
                self.mempool.processing.remove(&hash);
                self.mempool.pending.insert(hash, entry);
            }
            return Err(MachineError::NoTransactions);
        }

        let transactions_root = Block::compute_transactions_root(&transactions);
        let header = BlockHeader {
            block_number: new_height,
            parent_hash,
            proposer,
            timestamp: now,
            transactions_root,
            state_root,
        };
        let block_id = header.id();
        let block = Block {
            header,
            transactions,
            signatures: Vec::new(),
        };

        self.state = commit(ephemeral, block_id, state_root);
        for (hash, _) in &batch {
            self.mempool.processing.remove(hash);
        }
        debug!(height = new_height, %block_id, "produced block");
        Ok(block)
    }

    /// Validates `block` against current state without committing it.
    ///
    /// # Errors
    ///
    /// Returns the specific mismatch found (height, linkage,
    /// transactions root, state root, or apply failure).
    pub fn verify_block<F, E>(&self, block: &Block<C>, mut apply: F) -> Result<()>
    where
        C: Clone,
        F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        check_linkage(self.state.base().block_height, self.state.base().latest_hash, block)?;
        if !block.verify_transactions_root() {
            return Err(MachineError::TransactionsRootMismatch {
                expected: block.header.transactions_root,
                actual: Block::compute_transactions_root(&block.transactions),
            });
        }
        let (_, state_root) =
            ephemeral_next(&self.state, block.header.block_number, &block.transactions, &mut apply)?;
        if state_root != block.header.state_root {
            return Err(MachineError::StateRootMismatch {
                expected: block.header.state_root,
                actual: state_root,
            });
        }
        Ok(())
    }

    /// Validates and commits `block`, removing any of its transactions
    /// still sitting in the local mempool.
    ///
    /// # Errors
    ///
    /// See [`MachineCore::verify_block`].
    #[instrument(skip(self, block, apply), fields(machine_id = %self.self_id, height = block.header.block_number))]
    pub fn receive_block<F, E>(&mut self, block: &Block<C>, mut apply: F) -> Result<()>
    where
        C: Canonicalize + Clone,
        Message<C>: Canonicalize,
        F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        check_linkage(self.state.base().block_height, self.state.base().latest_hash, block)?;
        if !block.verify_transactions_root() {
            return Err(MachineError::TransactionsRootMismatch {
                expected: block.header.transactions_root,
                actual: Block::compute_transactions_root(&block.transactions),
            });
        }
        let (ephemeral, state_root) =
            ephemeral_next(&self.state, block.header.block_number, &block.transactions, &mut apply)?;
        if state_root != block.header.state_root {
            return Err(MachineError::StateRootMismatch {
                expected: block.header.state_root,
                actual: state_root,
            });
        }

        self.state = commit(ephemeral, block.id(), state_root);
        for tx in &block.transactions {
            let digest = tx.canonical_hash();
            self.mempool.pending.remove(&digest);
            self.mempool.processing.remove(&digest);
        }
        debug!("committed received block");
        Ok(())
    }

    /// Replays recorded blocks from `mode`'s starting point up to the
    /// journal's latest recorded height for `machine_id`, reapplying
    /// each via `apply`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::MissingBlock`] if a height in the
    /// replay range has no recorded block, or a storage/apply error.
    pub fn reconstruct_state<F, E>(
        machine_id: &MachineId,
        journal: &BlockJournal,
        mode: ReplayMode<'_, S>,
        mut apply: F,
    ) -> Result<S>
    where
        S: serde::de::DeserializeOwned,
        C: serde::de::DeserializeOwned + Clone,
        F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
        E: std::fmt::Display,
    {
        let (mut state, start_height) = match mode {
            ReplayMode::FromGenesis { genesis } => (genesis.clone(), 0u64),
            ReplayMode::FromSnapshot { state, at_height } => (state.clone(), at_height),
        };

        let target = journal.latest_height(machine_id)?.unwrap_or(start_height);
        for height in (start_height + 1)..=target {
            let block: Block<C> = journal
                .get_block_by_number(machine_id, height)?
                .ok_or(MachineError::MissingBlock(height))?;
            state.base_mut().block_height = block.header.block_number;
            apply(&mut state, &block.transactions)
                .map_err(|e| MachineError::ApplyFailed(e.to_string()))?;
            state.base_mut().latest_hash = block.id();
            state.base_mut().state_root = block.header.state_root;
        }
        Ok(state)
    }
}

/// Removes up to `max` entries from `pending`, ordered by arrival
/// (`received_at`, then digest for determinism on ties).
fn drain_batch<C>(
    pending: &mut HashMap<Hash, MempoolEntry<C>>,
    max: usize,
) -> Vec<(Hash, MempoolEntry<C>)> {
    let mut ordered: Vec<Hash> = pending.keys().copied().collect();
    ordered.sort_by_key(|hash| (pending[hash].received_at, *hash));
    ordered.truncate(max);

    ordered
        .into_iter()
        .filter_map(|hash| pending.remove(&hash).map(|entry| (hash, entry)))
        .collect()
}

/// Checks a block's height and parent linkage against the current
/// chain head, without touching its transactions.
fn check_linkage<C>(current_height: u64, current_hash: Hash, block: &Block<C>) -> Result<()> {
    let expected_height = current_height + 1;
    if block.header.block_number != expected_height {
        return Err(MachineError::HeightMismatch {
            expected: expected_height,
            actual: block.header.block_number,
        });
    }
    if block.header.parent_hash != current_hash {
        return Err(MachineError::LinkMismatch {
            expected: current_hash,
            actual: block.header.parent_hash,
        });
    }
    Ok(())
}

/// Builds the ephemeral post-transaction state used both to produce a
/// block's `state_root` and to verify one: `block_height` is advanced
/// first, but `latest_hash`/`state_root` are left holding their prior
/// values for hashing, since the new block's digest must not depend on
/// itself. The caller commits the new `latest_hash`/`state_root` only
/// after the block digest has been computed.
fn ephemeral_next<S, C, F, E>(
    state: &S,
    new_height: u64,
    transactions: &[Message<C>],
    apply: &mut F,
) -> Result<(S, Hash)>
where
    S: HasBase + Clone,
    F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
    E: std::fmt::Display,
    S: Canonicalize,
{
    let mut ephemeral = state.clone();
    ephemeral.base_mut().block_height = new_height;
    apply(&mut ephemeral, transactions).map_err(|e| MachineError::ApplyFailed(e.to_string()))?;
    let state_root = ephemeral.canonical_hash();
    Ok((ephemeral, state_root))
}

/// Produce-mode counterpart to [`ephemeral_next`]: applies
/// `transactions` one at a time instead of as a single batch. A
/// transaction `apply` rejects is dropped — its attempted mutation is
/// discarded and it is excluded from the returned list — rather than
/// failing the whole block, so one bad transaction in the drained
/// batch never blocks the rest from sealing.
fn ephemeral_next_skipping<S, C, F, E>(
    state: &S,
    new_height: u64,
    transactions: Vec<Message<C>>,
    apply: &mut F,
) -> (S, Vec<Message<C>>, Hash)
where
    S: HasBase + Clone + Canonicalize,
    F: FnMut(&mut S, &[Message<C>]) -> std::result::Result<(), E>,
{
    let mut ephemeral = state.clone();
    ephemeral.base_mut().block_height = new_height;
    let mut included = Vec::with_capacity(transactions.len());
    for tx in transactions {
        let mut attempt = ephemeral.clone();
        if apply(&mut attempt, std::slice::from_ref(&tx)).is_ok() {
            ephemeral = attempt;
            included.push(tx);
        }
    }
    let state_root = ephemeral.canonical_hash();
    (ephemeral, included, state_root)
}

/// Finalizes an ephemeral state into the committed head: stamps
/// `latest_hash`/`state_root` to their new values now that the block
/// digest is known.
fn commit<S: HasBase>(mut ephemeral: S, block_id: Hash, state_root: Hash) -> S {
    ephemeral.base_mut().latest_hash = block_id;
    ephemeral.base_mut().state_root = state_root;
    ephemeral
}
