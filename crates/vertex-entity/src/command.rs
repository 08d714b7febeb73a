//! The command set an `EntityMachine` accepts, and the bus events it emits.

use serde::{Deserialize, Serialize};
use vertex_bus::Topic;
use vertex_types::canonical::canonicalize_map;
use vertex_types::{
    Amount, Canonicalize, ChannelState, EntityConfig, Hash, MachineId, ProposalId,
    SignedTransaction,
};
use std::collections::BTreeMap;

/// Proof that a channel sits in the state a `CLOSE_CHANNEL` command
/// claims: the full `ChannelState` the caller read off the
/// `ChannelMachine`, whose canonical hash must match the root this
/// entity has on record in `channels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelClosureProof {
    /// The channel's state as of closure.
    pub channel_state: ChannelState,
}

/// Commands recognized by an `EntityMachine`.
///
/// `PROPOSE_TRANSACTION` and `UPDATE_CONFIG` each create a fresh
/// `ACTIVE` proposal; `APPROVE_PROPOSAL`/`CANCEL_PROPOSAL` drive it
/// toward a terminal status. `OPEN_CHANNEL`/`CLOSE_CHANNEL` manage
/// this entity's co-owned channels directly, bypassing the proposal
/// DAG (bilateral channel operations are already gated by the
/// channel's own two-signature requirement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityCommand<C> {
    /// Proposes admitting `transaction`, claiming entity-nonce `nonce`.
    ///
    /// If `transaction.partial_signatures` already carries enough
    /// signer weight to reach `config.threshold` on its own, the
    /// proposal executes immediately rather than waiting on
    /// `APPROVE_PROPOSAL` votes.
    ProposeTransaction {
        /// The transaction to admit, with whatever partial signatures
        /// signers have already collected for it.
        transaction: SignedTransaction<C>,
        /// The entity-nonce this transaction claims; must exceed the
        /// entity's current nonce.
        nonce: u64,
    },
    /// Proposes replacing the entity's `EntityConfig`.
    UpdateConfig {
        /// The replacement config. Validated against
        /// `EntityConfig::validate` at proposal-creation time.
        new_config: EntityConfig,
    },
    /// Casts the sending key's approval vote for `proposal_id`.
    ApproveProposal {
        /// The proposal being voted on.
        proposal_id: ProposalId,
    },
    /// Withdraws `proposal_id`. Only the original proposer or a
    /// signer present in `config.admins` may cancel.
    CancelProposal {
        /// The proposal being withdrawn.
        proposal_id: ProposalId,
    },
    /// Opens a fresh bilateral channel with `partner_id`, seeded with
    /// `balances` (which must cover exactly `{self, partner_id}`).
    OpenChannel {
        /// The other participant.
        partner_id: MachineId,
        /// Starting balances, keyed by participant.
        balances: BTreeMap<MachineId, Amount>,
        /// The dispute window new state updates on this channel get.
        dispute_period_ms: i64,
    },
    /// Closes a channel this entity co-owns, removing it from
    /// `channels` once `proof` demonstrates it is eligible.
    CloseChannel {
        /// The channel being closed.
        channel_id: MachineId,
        /// Proof of the channel's current state.
        proof: ChannelClosureProof,
    },
}

impl<C: Canonicalize> Canonicalize for EntityCommand<C>
where
    vertex_types::Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        match self {
            Self::ProposeTransaction { transaction, nonce } => {
                let mut out = vec![0u8];
                out.extend(transaction.canonicalize());
                out.extend(nonce.canonicalize());
                out
            }
            Self::UpdateConfig { new_config } => {
                let mut out = vec![1u8];
                out.extend(new_config.canonicalize());
                out
            }
            Self::ApproveProposal { proposal_id } => {
                let mut out = vec![2u8];
                out.extend(proposal_id.canonicalize());
                out
            }
            Self::CancelProposal { proposal_id } => {
                let mut out = vec![3u8];
                out.extend(proposal_id.canonicalize());
                out
            }
            Self::OpenChannel {
                partner_id,
                balances,
                dispute_period_ms,
            } => {
                let mut out = vec![4u8];
                out.extend(partner_id.canonicalize());
                out.extend(canonicalize_map(
                    balances.iter().map(|(k, v)| (k.clone(), *v)),
                ));
                out.extend(dispute_period_ms.canonicalize());
                out
            }
            Self::CloseChannel { channel_id, proof } => {
                let mut out = vec![5u8];
                out.extend(channel_id.canonicalize());
                out.extend(proof.channel_state.canonicalize());
                out
            }
        }
    }
}

impl<C> Topic for EntityCommand<C> {
    fn topic(&self) -> &'static str {
        match self {
            Self::ProposeTransaction { .. } => "PROPOSE_TRANSACTION",
            Self::UpdateConfig { .. } => "UPDATE_CONFIG",
            Self::ApproveProposal { .. } => "APPROVE_PROPOSAL",
            Self::CancelProposal { .. } => "CANCEL_PROPOSAL",
            Self::OpenChannel { .. } => "OPEN_CHANNEL",
            Self::CloseChannel { .. } => "CLOSE_CHANNEL",
        }
    }
}

/// Events an `EntityMachine` broadcasts as a proposal moves through
/// its lifecycle, or a channel is opened/closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityEvent {
    /// A fresh `ACTIVE` proposal was created.
    ProposalCreated {
        /// The new proposal's id.
        proposal_id: ProposalId,
    },
    /// A vote was cast but threshold was not yet reached.
    ProposalApproved {
        /// The proposal voted on.
        proposal_id: ProposalId,
        /// Total weight of `true` votes so far.
        weight: u32,
    },
    /// Threshold was reached; the proposal's effect was applied.
    ProposalExecuted {
        /// The executed proposal's id.
        proposal_id: ProposalId,
    },
    /// The proposal was withdrawn before reaching threshold.
    ProposalCancelled {
        /// The cancelled proposal's id.
        proposal_id: ProposalId,
    },
    /// An `ACTIVE` proposal was swept past its expiry.
    ProposalExpired {
        /// The expired proposal's id.
        proposal_id: ProposalId,
    },
    /// A fresh channel was opened.
    ChannelOpened {
        /// The new channel's id.
        channel_id: MachineId,
    },
    /// A channel was closed and removed from active bookkeeping.
    ChannelClosed {
        /// The closed channel's id.
        channel_id: MachineId,
    },
}

impl Topic for EntityEvent {
    fn topic(&self) -> &'static str {
        match self {
            Self::ProposalCreated { .. } => "PROPOSAL_CREATED",
            Self::ProposalApproved { .. } => "PROPOSAL_APPROVED",
            Self::ProposalExecuted { .. } => "PROPOSAL_EXECUTED",
            Self::ProposalCancelled { .. } => "PROPOSAL_CANCELLED",
            Self::ProposalExpired { .. } => "PROPOSAL_EXPIRED",
            Self::ChannelOpened { .. } => "CHANNEL_OPENED",
            Self::ChannelClosed { .. } => "CHANNEL_CLOSED",
        }
    }
}

/// Derives a channel id deterministically from its two participants,
/// independent of argument order: `H(canonical(sorted(a, b)))`,
/// truncated to 16 hex characters, mirroring
/// `vertex_hierarchy::derive_entity_id`'s derivation-by-hash idiom.
#[must_use]
pub fn derive_channel_id(a: &MachineId, b: &MachineId) -> MachineId {
    let (first, second) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
    let mut bytes = first.canonicalize();
    bytes.extend(second.canonicalize());
    let hex = Hash::digest(&bytes).to_hex();
    MachineId::new(&hex[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_channel_id_is_order_independent() {
        let a = MachineId::new("entity-a");
        let b = MachineId::new("entity-b");
        assert_eq!(derive_channel_id(&a, &b), derive_channel_id(&b, &a));
    }

    #[test]
    fn derive_channel_id_is_16_hex_chars() {
        let id = derive_channel_id(&MachineId::new("a"), &MachineId::new("b"));
        assert_eq!(id.as_str().len(), 16);
    }
}
