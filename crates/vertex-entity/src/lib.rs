//! # vertex-entity
//!
//! `EntityMachine`: a threshold-weighted multisig account. Proposals
//! gather `true`/`false` votes from `config.signers`; once the
//! approving weight reaches `config.threshold` a proposal's effect —
//! admitting a transaction or replacing the config — is applied
//! immediately and atomically. A transaction proposal that already
//! arrives with enough verifying partial signatures to reach threshold
//! skips the voting round entirely. Entities also own their bilateral
//! channels' lifecycle at the open/close boundary; the channel's own
//! state machine (`vertex-channel`) governs everything in between.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod apply;
mod command;
mod error;
mod machine;
mod validation;

pub use command::{derive_channel_id, ChannelClosureProof, EntityCommand, EntityEvent};
pub use error::{EntityError, Result};
pub use machine::EntityMachine;
pub use validation::{validate_transaction, TransactionValidation};
