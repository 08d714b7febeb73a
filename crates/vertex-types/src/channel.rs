//! Bilateral state channel state and the dispute sub-state-machine.

use crate::amount::Amount;
use crate::canonical::{canonicalize_map, Canonicalize};
use crate::hash::Hash;
use crate::machine_id::MachineId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The channel's lifecycle state.
///
/// The data model's informal description only carries an `isOpen`
/// flag, but §4.7 names five distinct states that do not collapse
/// into a boolean (in particular `Settling` and `Resolved` are both
/// "not open yet, not closed either"), so this enum is the
/// authoritative state and [`ChannelState::is_open`] is a derived
/// convenience accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    /// Accepting balance updates.
    Open,
    /// A dispute is in progress.
    Disputed,
    /// A dispute concluded; settlement has not yet been applied.
    Resolved,
    /// Settlement is being finalized.
    Settling,
    /// Terminal: no further commands accepted.
    Closed,
}

/// A balance update signed by both participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedStateUpdate {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// Balances this update establishes, keyed by participant.
    pub balances: BTreeMap<MachineId, Amount>,
    /// Unix milliseconds at construction.
    pub timestamp: i64,
    /// Hex-encoded `r||s` signatures, keyed by participant.
    pub signatures: BTreeMap<MachineId, String>,
    /// `H(canonical(self))` computed with an empty `signatures` map,
    /// i.e. the digest every signature in `signatures` is taken over.
    pub state_hash: Hash,
}

impl Canonicalize for SignedStateUpdate {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.sequence.canonicalize());
        out.extend(canonicalize_map(
            self.balances.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(self.timestamp.canonicalize());
        out
    }
}

impl SignedStateUpdate {
    /// Builds an unsigned update and computes its `state_hash`.
    #[must_use]
    pub fn new(sequence: u64, balances: BTreeMap<MachineId, Amount>, timestamp: i64) -> Self {
        let mut update = Self {
            sequence,
            balances,
            timestamp,
            signatures: BTreeMap::new(),
            state_hash: Hash::GENESIS,
        };
        update.state_hash = update.canonical_hash();
        update
    }

    /// The total balance this update commits to.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.balances.values().copied().sum()
    }
}

/// The dispute sub-state-machine's state while a channel is `Disputed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeState {
    /// The participant that opened the dispute.
    pub initiator: MachineId,
    /// The update the initiator is disputing.
    pub contested_update: SignedStateUpdate,
    /// Unix milliseconds the dispute was opened.
    pub start_time: i64,
    /// Whether the dispute has already been resolved.
    pub resolved: bool,
    /// Counter-evidence submitted by each participant so far.
    pub evidence: BTreeMap<MachineId, SignedStateUpdate>,
    /// Unix milliseconds at which an unresolved dispute auto-resolves.
    pub automatic_resolution_time: i64,
}

impl DisputeState {
    /// Returns whether `now` is at or past the automatic-resolution deadline.
    #[must_use]
    pub fn is_timed_out(&self, now: i64) -> bool {
        !self.resolved && now >= self.automatic_resolution_time
    }
}

/// Bilateral off-chain accounting state with on-chain-style dispute resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelState {
    /// The two participants, fixed for the channel's lifetime.
    pub participants: (MachineId, MachineId),
    /// Current balances, keyed by participant.
    pub balances: BTreeMap<MachineId, Amount>,
    /// Current sequence number; monotonically increasing.
    pub sequence: u64,
    /// The channel's lifecycle state.
    pub status: ChannelStatus,
    /// Wall-clock window a dispute stays open for counter-evidence.
    pub dispute_period_ms: i64,
    /// Every accepted update, keyed by sequence number.
    pub state_updates: BTreeMap<u64, SignedStateUpdate>,
    /// The in-progress dispute, if `status == Disputed`.
    pub current_dispute: Option<DisputeState>,
}

impl ChannelState {
    /// Convenience accessor: `status == Open`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.status, ChannelStatus::Open)
    }

    /// The invariant total the channel must conserve across every transition.
    #[must_use]
    pub fn total_balance(&self) -> Amount {
        self.balances.values().copied().sum()
    }
}

impl Canonicalize for ChannelState {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.participants.0.canonicalize());
        out.extend(self.participants.1.canonicalize());
        out.extend(canonicalize_map(
            self.balances.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(self.sequence.canonicalize());
        out.push(match self.status {
            ChannelStatus::Open => 0,
            ChannelStatus::Disputed => 1,
            ChannelStatus::Resolved => 2,
            ChannelStatus::Settling => 3,
            ChannelStatus::Closed => 4,
        });
        out.extend(self.dispute_period_ms.canonicalize());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balances(a: u128, b: u128) -> BTreeMap<MachineId, Amount> {
        let mut map = BTreeMap::new();
        map.insert(MachineId::new("x"), Amount::new(a));
        map.insert(MachineId::new("y"), Amount::new(b));
        map
    }

    #[test]
    fn signed_update_hash_ignores_signatures() {
        let a = SignedStateUpdate::new(1, balances(60, 140), 0);
        let mut b = a.clone();
        b.signatures
            .insert(MachineId::new("x"), "deadbeef".to_string());
        assert_eq!(a.state_hash, b.canonical_hash());
    }

    #[test]
    fn total_is_conserved_across_rebalancing() {
        let before = SignedStateUpdate::new(0, balances(100, 100), 0);
        let after = SignedStateUpdate::new(1, balances(60, 140), 1);
        assert_eq!(before.total(), after.total());
    }

    #[test]
    fn dispute_times_out_at_deadline() {
        let dispute = DisputeState {
            initiator: MachineId::new("x"),
            contested_update: SignedStateUpdate::new(1, balances(60, 140), 0),
            start_time: 0,
            resolved: false,
            evidence: BTreeMap::new(),
            automatic_resolution_time: 1000,
        };
        assert!(!dispute.is_timed_out(999));
        assert!(dispute.is_timed_out(1000));
    }
}
