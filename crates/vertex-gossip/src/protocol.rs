//! Pure functions governing block de-duplication and the simulator
//! fork-choice rule (spec.md §4.9).

use vertex_types::{BlockHeader, Hash};

/// The de-duplication key a block is tracked under:
/// `BLOCK:{hash}`. First receipt of a given hash is applied and
/// relayed; every later receipt of the same hash is dropped before
/// reaching a handler.
#[must_use]
pub fn block_dedup_key(hash: &Hash) -> String {
    format!("BLOCK:{}", hash.to_hex())
}

/// The outcome of evaluating an incoming block header against local
/// chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChoice {
    /// Accept and apply the block immediately.
    Accept,
    /// Defer application; the caller should issue `REQUEST_BLOCK` for
    /// the header's `parent_hash` and retry once it arrives.
    DeferMissingParent,
}

/// Applies spec.md §4.9's three-clause fork-choice rule:
///
/// 1. `header.parent_hash == current_tip` — extends the known tip.
/// 2. `header.block_number > current_height && parent_known` — the
///    parent is already in local storage even though it isn't the
///    current tip (a sibling branch catching up, or backfilled
///    out of order).
/// 3. `header.parent_hash == Hash::GENESIS && genesis_known` — the
///    very first block on a chain whose genesis state is present.
///
/// Any other combination defers, asking the caller to fetch the
/// missing parent via `REQUEST_BLOCK` before retrying.
#[must_use]
pub fn fork_choice(
    header: &BlockHeader,
    current_tip: Hash,
    current_height: u64,
    parent_known: bool,
    genesis_known: bool,
) -> ForkChoice {
    if header.parent_hash == current_tip {
        return ForkChoice::Accept;
    }
    if header.block_number > current_height && parent_known {
        return ForkChoice::Accept;
    }
    if header.parent_hash == Hash::GENESIS && genesis_known {
        return ForkChoice::Accept;
    }
    ForkChoice::DeferMissingParent
}
