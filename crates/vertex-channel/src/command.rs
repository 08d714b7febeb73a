//! The command set a `ChannelMachine` accepts, and the events it emits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vertex_bus::Topic;
use vertex_types::{Amount, MachineId, SignedStateUpdate};

/// Commands recognized by a `ChannelMachine`.
///
/// Unlike `ServerCommand`/`SignerCommand`/`EntityCommand`, these never
/// ride a `Message` through a mempool and block pipeline: a channel's
/// two participants apply commands directly against its
/// `ChannelState`, off-chain, and only the opening and closing
/// boundary is witnessed by the owning `EntityMachine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelCommand {
    /// Proposes new balances, each signed by both participants over
    /// `H(canonical(StateUpdate{sequence+1, newBalances, now}))`.
    UpdateBalance {
        /// The proposed balances. Must cover exactly the two participants.
        new_balances: BTreeMap<MachineId, Amount>,
        /// Hex-encoded signatures, keyed by participant.
        signatures: BTreeMap<MachineId, String>,
    },
    /// Opens a dispute, optionally attaching the sender's own evidence
    /// for the authoritative balance.
    InitiateDispute {
        /// The sender's counter-evidence, if offered up front.
        evidence: Option<SignedStateUpdate>,
    },
    /// Submits evidence for an in-progress dispute.
    ResolveDispute {
        /// The sender's claimed authoritative state update.
        evidence: SignedStateUpdate,
    },
    /// Applies a settlement reached outside the normal dispute path.
    FinalizeSettlement {
        /// The final balances. Must cover exactly the two participants
        /// and conserve the channel's total.
        final_balances: BTreeMap<MachineId, Amount>,
    },
    /// Closes the channel. Refused while a dispute is active.
    CloseChannel,
}

impl Topic for ChannelCommand {
    fn topic(&self) -> &'static str {
        match self {
            Self::UpdateBalance { .. } => "UPDATE_BALANCE",
            Self::InitiateDispute { .. } => "INITIATE_DISPUTE",
            Self::ResolveDispute { .. } => "RESOLVE_DISPUTE",
            Self::FinalizeSettlement { .. } => "FINALIZE_SETTLEMENT",
            Self::CloseChannel => "CLOSE_CHANNEL",
        }
    }
}

/// Events a `ChannelMachine` emits after a command, or an unprompted
/// tick, has taken effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// The channel's balances advanced to `sequence`.
    BalanceUpdated {
        /// The new sequence number.
        sequence: u64,
    },
    /// A dispute was opened.
    DisputeInitiated,
    /// A participant's counter-evidence was recorded; the dispute is
    /// still awaiting the other participant's.
    EvidenceRecorded {
        /// The participant whose evidence was recorded.
        participant: MachineId,
    },
    /// Both participants' evidence is in; the dispute resolved to the
    /// highest-sequence update.
    DisputeResolved {
        /// The authoritative sequence number.
        sequence: u64,
    },
    /// The dispute window elapsed with at least one participant silent;
    /// the channel resolved via the penalty/redistribution rule.
    DisputeTimedOut {
        /// The authoritative sequence number after redistribution.
        sequence: u64,
        /// Participants debited for failing to submit evidence.
        penalized: Vec<MachineId>,
    },
    /// A settlement was applied.
    SettlementFinalized,
    /// The channel closed.
    ChannelClosed,
}

impl Topic for ChannelEvent {
    fn topic(&self) -> &'static str {
        match self {
            Self::BalanceUpdated { .. } => "BALANCE_UPDATED",
            Self::DisputeInitiated => "DISPUTE_INITIATED",
            Self::EvidenceRecorded { .. } => "EVIDENCE_RECORDED",
            Self::DisputeResolved { .. } => "DISPUTE_RESOLVED",
            Self::DisputeTimedOut { .. } => "DISPUTE_TIMED_OUT",
            Self::SettlementFinalized => "SETTLEMENT_FINALIZED",
            Self::ChannelClosed => "CHANNEL_CLOSED",
        }
    }
}
