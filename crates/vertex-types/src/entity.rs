//! Entity (multisig account) configuration, proposals, and state.

use crate::amount::Amount;
use crate::canonical::{canonicalize_map, Canonicalize};
use crate::hash::Hash;
use crate::machine_id::MachineId;
use crate::signed_transaction::SignedTransaction;
use crate::state::BaseMachineState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The weighted-signer configuration an Entity is gated by.
///
/// Invariants, checked by [`EntityConfig::validate`]: `threshold > 0`,
/// every weight `> 0`, `threshold <= sum(weights)`, `signers` non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Minimum sum of approving signer weights required to execute a proposal.
    pub threshold: u32,
    /// Hex-encoded public key to voting weight.
    pub signers: BTreeMap<String, u32>,
    /// Signer public keys additionally allowed to cancel proposals.
    pub admins: BTreeSet<String>,
}

/// A config was rejected because it violates one of the invariants
/// `EntityConfig` is required to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// `signers` was empty.
    NoSigners,
    /// `threshold` was zero.
    ZeroThreshold,
    /// One of `signers`'s weights was zero.
    ZeroWeight(String),
    /// `threshold` exceeds the sum of all signer weights.
    ThresholdUnreachable { threshold: u32, total_weight: u32 },
}

impl EntityConfig {
    /// Checks every `EntityConfig` invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.signers.is_empty() {
            return Err(ConfigValidationError::NoSigners);
        }
        if self.threshold == 0 {
            return Err(ConfigValidationError::ZeroThreshold);
        }
        for (key, weight) in &self.signers {
            if *weight == 0 {
                return Err(ConfigValidationError::ZeroWeight(key.clone()));
            }
        }
        let total_weight: u32 = self.signers.values().sum();
        if self.threshold > total_weight {
            return Err(ConfigValidationError::ThresholdUnreachable {
                threshold: self.threshold,
                total_weight,
            });
        }
        Ok(())
    }

    /// Sums the weight of every signer key present and `true` in `approvals`.
    #[must_use]
    pub fn approved_weight(&self, approvals: &BTreeMap<String, bool>) -> u32 {
        approvals
            .iter()
            .filter(|(_, approved)| **approved)
            .filter_map(|(signer, _)| self.signers.get(signer))
            .sum()
    }
}

impl Canonicalize for EntityConfig {
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.threshold.canonicalize());
        out.extend(canonicalize_map(
            self.signers.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(canonicalize_map(
            self.admins.iter().map(|k| (k.clone(), true)),
        ));
        out
    }
}

/// A unique proposal identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl Canonicalize for ProposalId {
    fn canonicalize(&self) -> Vec<u8> {
        self.0.canonicalize()
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a proposal, once executed, does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    /// Appends a signed transaction to the entity's pending set.
    Transaction,
    /// Replaces the entity's `EntityConfig`.
    ConfigUpdate,
}

/// A proposal's position in its status DAG. `Active` is the only
/// source state; every other state is terminal and irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Collecting approvals.
    Active,
    /// Threshold met; effect applied.
    Executed,
    /// Withdrawn by the proposer or an admin.
    Cancelled,
    /// Passed its `expires_at` while still `Active`.
    Expired,
    /// Rejected outright (reserved for future validation paths).
    Rejected,
}

/// A gated operation inside an Entity, awaiting threshold-weighted approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal<C> {
    /// Unique proposal id.
    pub id: ProposalId,
    /// Hex-encoded public key of the proposer.
    pub proposer: String,
    /// What this proposal does once executed.
    pub proposal_type: ProposalType,
    /// The transaction to admit, if `proposal_type == Transaction`.
    pub transaction: Option<SignedTransaction<C>>,
    /// The replacement config, if `proposal_type == ConfigUpdate`.
    pub new_config: Option<EntityConfig>,
    /// Per-signer approval votes.
    pub approvals: BTreeMap<String, bool>,
    /// Current status.
    pub status: ProposalStatus,
    /// Unix milliseconds at creation.
    pub timestamp: i64,
    /// Unix milliseconds after which an `Active` proposal expires.
    pub expires_at: i64,
    /// Unix milliseconds at which the proposal reached a terminal status.
    pub finalized_at: Option<i64>,
}

impl<C> Proposal<C> {
    /// The expiry window every new proposal is given: 24 hours.
    pub const EXPIRY_MS: i64 = 24 * 60 * 60 * 1000;

    /// Returns whether `now` is at or past this proposal's expiry,
    /// regardless of its recorded status.
    #[must_use]
    pub fn is_past_expiry(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Multisig account state: the base state plus config, balance,
/// channels, and the proposal/pending-transaction bookkeeping the
/// threshold engine operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState<C> {
    /// Shared base state.
    pub base: BaseMachineState,
    /// Current weighted-signer configuration.
    pub config: EntityConfig,
    /// Channels this entity co-owns, keyed by channel id, valued by
    /// the channel's last-known state root.
    pub channels: BTreeMap<MachineId, Hash>,
    /// Current balance.
    pub balance: Amount,
    /// Monotonically increasing transaction nonce.
    pub nonce: u64,
    /// Proposals ever created, keyed by id.
    pub proposals: BTreeMap<ProposalId, Proposal<C>>,
    /// Transactions admitted by an executed proposal, awaiting
    /// inclusion in a block, keyed by `H(canonical(transaction))`.
    pub pending_transactions: BTreeMap<Hash, SignedTransaction<C>>,
}

impl<C: Canonicalize> Canonicalize for Proposal<C>
where
    crate::message::Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(self.id.canonicalize());
        out.extend(self.proposer.canonicalize());
        out.extend(vec![match self.proposal_type {
            ProposalType::Transaction => 0u8,
            ProposalType::ConfigUpdate => 1u8,
        }]);
        out.extend(self.transaction.clone().canonicalize());
        out.extend(self.new_config.clone().canonicalize());
        out.extend(canonicalize_map(
            self.approvals.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.push(match self.status {
            ProposalStatus::Active => 0,
            ProposalStatus::Executed => 1,
            ProposalStatus::Cancelled => 2,
            ProposalStatus::Expired => 3,
            ProposalStatus::Rejected => 4,
        });
        out.extend(self.timestamp.canonicalize());
        out.extend(self.expires_at.canonicalize());
        out.extend(self.finalized_at.canonicalize());
        out
    }
}

impl<C: Canonicalize> Canonicalize for EntityState<C>
where
    crate::message::Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        let mut out = self.base.canonicalize();
        out.extend(self.config.canonicalize());
        out.extend(canonicalize_map(
            self.channels.iter().map(|(k, v)| (k.clone(), *v)),
        ));
        out.extend(self.balance.canonicalize());
        out.extend(self.nonce.canonicalize());
        out.extend(canonicalize_map(
            self.proposals.iter().map(|(k, v)| (k.clone(), v.clone())),
        ));
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

    fn config(threshold: u32, weights: &[(&str, u32)]) -> EntityConfig {
        EntityConfig {
            threshold,
            signers: weights.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            admins: BTreeSet::new(),
        }
    }

    #[test]
    fn rejects_unreachable_threshold() {
        let cfg = config(5, &[("a", 2), ("b", 2)]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigValidationError::ThresholdUnreachable {
                threshold: 5,
                total_weight: 4,
            })
        );
    }

    #[test]
    fn accepts_reachable_threshold() {
        let cfg = config(2, &[("a", 1), ("b", 1), ("c", 1)]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn approved_weight_sums_only_true_votes() {
        let cfg = config(2, &[("a", 1), ("b", 1), ("c", 1)]);
        let mut approvals = BTreeMap::new();
        approvals.insert("a".to_string(), true);
        approvals.insert("b".to_string(), false);
        assert_eq!(cfg.approved_weight(&approvals), 1);
    }
}
