//! Errors surfaced by [`crate::EntityMachine`].

use vertex_types::{ConfigValidationError, MachineId};

/// A rejected entity command.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// `new_config` failed [`vertex_types::EntityConfig::validate`].
    #[error("invalid config: {0:?}")]
    InvalidConfig(ConfigValidationError),
    /// A transaction's claimed nonce did not exceed the entity's current nonce.
    #[error("stale nonce: got {got}, current is {current}")]
    StaleNonce {
        /// The nonce carried by the rejected command.
        got: u64,
        /// The entity's current nonce.
        current: u64,
    },
    /// The referenced proposal does not exist.
    #[error("unknown proposal {0}")]
    UnknownProposal(vertex_types::ProposalId),
    /// The command targeted a proposal that is no longer `ACTIVE`.
    #[error("proposal {0} is not active")]
    ProposalNotActive(vertex_types::ProposalId),
    /// `CANCEL_PROPOSAL` was attempted by a key that is neither the
    /// proposer nor an admin.
    #[error("{0} is not authorized to cancel this proposal")]
    Unauthorized(String),
    /// `OPEN_CHANNEL` referenced a channel id already present in `channels`.
    #[error("channel {0} is already open")]
    ChannelExists(MachineId),
    /// `OPEN_CHANNEL`'s balances did not cover exactly the two participants.
    #[error("open channel balances must cover exactly the two participants")]
    InvalidChannelBalances,
    /// `CLOSE_CHANNEL` referenced a channel id absent from `channels`.
    #[error("unknown channel {0}")]
    UnknownChannel(MachineId),
    /// The `ChannelState` proof supplied to `CLOSE_CHANNEL` does not
    /// derive `channel_id`, or this entity is not one of its two
    /// participants.
    #[error("channel proof does not match {0}")]
    ChannelProofMismatch(MachineId),
    /// `CLOSE_CHANNEL` was attempted on a channel that is neither
    /// `SETTLING` with both participants' signatures nor `DISPUTED`
    /// past its automatic resolution deadline.
    #[error("channel is not eligible for closure")]
    ChannelNotCloseable,
    /// The underlying block pipeline rejected the operation (e.g. a
    /// full mempool).
    #[error(transparent)]
    Machine(#[from] vertex_machine::MachineError),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, EntityError>;
