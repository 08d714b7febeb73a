//! # vertex-channel
//!
//! `ChannelMachine`: a bilateral payment channel between two entities.
//! Balances are updated off-chain by mutual signature; either side may
//! open a dispute, after which both participants have a wall-clock
//! window to present their highest-sequence counter-evidence before the
//! channel auto-resolves and, one way or another, settles.
//!
//! Channels do not ride the block-production pipeline that
//! `vertex-machine` gives the server, signer, and entity machines:
//! commands are applied directly to [`vertex_types::ChannelState`],
//! and only the opening and closing boundary is witnessed on-chain by
//! the owning `EntityMachine`.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod apply;
mod command;
mod error;
mod machine;

pub use command::{ChannelCommand, ChannelEvent};
pub use error::{ChannelError, Result};
pub use machine::ChannelMachine;
