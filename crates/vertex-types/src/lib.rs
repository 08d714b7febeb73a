//! # vertex-types
//!
//! The wire and state data model shared by every level of the vertex
//! hierarchy (Server, Signer, Entity, Channel). Nothing in this crate
//! knows how to *drive* a machine; it only defines what a machine's
//! state and messages look like, and how to turn either into the
//! canonical byte sequence the rest of the system hashes and signs.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod amount;
pub mod block;
pub mod canonical;
pub mod channel;
pub mod entity;
pub mod hash;
pub mod machine_id;
pub mod mempool;
pub mod message;
pub mod signed_transaction;
pub mod state;

pub use amount::Amount;
pub use block::{Block, BlockHeader};
pub use canonical::Canonicalize;
pub use channel::{ChannelState, ChannelStatus, DisputeState, SignedStateUpdate};
pub use entity::{
    ConfigValidationError, EntityConfig, EntityState, Proposal, ProposalId, ProposalStatus,
    ProposalType,
};
pub use hash::Hash;
pub use machine_id::MachineId;
pub use mempool::{MempoolEntry, MempoolState};
pub use message::{MachineEvent, Message, MessageKind, Recipient};
pub use signed_transaction::SignedTransaction;
pub use state::{BaseMachineState, ServerState, SignerState};

/// The namespace prefix mixed into every digest that is signed, to keep
/// signatures from one protocol context from verifying in another.
pub const NAMESPACE: &[u8] = b"_VERTEX";

/// The sentinel recipient used to mark a [`MachineEvent`] as addressed
/// to every registered machine rather than to a single mailbox.
pub const BROADCAST_ALL: &str = "ALL";
