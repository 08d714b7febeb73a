//! Errors surfaced by [`crate::ChannelMachine`].

/// A rejected channel command.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// `UPDATE_BALANCE` was attempted outside `OPEN`.
    #[error("channel is not open")]
    NotOpen,
    /// `new_balances` did not cover exactly the channel's two participants.
    #[error("balances must cover exactly the two participants")]
    WrongParticipants,
    /// `Σnew_balances != Σcurrent_balances`.
    #[error("balance update does not conserve the channel total")]
    ConservationViolated,
    /// One or both participants' signatures over the proposed update
    /// were missing or failed to verify.
    #[error("missing or invalid signature from a participant")]
    InvalidSignatures,
    /// `INITIATE_DISPUTE` was attempted while a dispute is already active.
    #[error("a dispute is already active")]
    DisputeAlreadyActive,
    /// `RESOLVE_DISPUTE` or `FINALIZE_SETTLEMENT` was attempted outside `DISPUTED`.
    #[error("channel is not disputed")]
    NotDisputed,
    /// `RESOLVE_DISPUTE` arrived at or after `automatic_resolution_time`.
    #[error("the dispute window has closed")]
    DisputeWindowClosed,
    /// `FINALIZE_SETTLEMENT` was attempted outside `RESOLVED`.
    #[error("channel is not resolved")]
    NotResolved,
    /// `final_balances` did not cover exactly the channel's two participants.
    #[error("settlement must cover exactly the two participants")]
    SettlementWrongParticipants,
    /// `Σfinal_balances != Σcurrent_balances`.
    #[error("settlement does not conserve the channel total")]
    SettlementConservationViolated,
    /// `CLOSE_CHANNEL` was attempted while a dispute is active.
    #[error("an unresolved dispute is active")]
    DisputeStillActive,
    /// `CLOSE_CHANNEL` was attempted on an already-closed channel.
    #[error("channel is already closed")]
    AlreadyClosed,
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
