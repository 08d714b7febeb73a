//! Top-of-hierarchy machine: owns each child's last-known state root,
//! seals blocks of accepted commands on a timer, and periodically
//! probes children for sync.
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod apply;
mod command;
mod error;
mod machine;

pub use apply::{apply, apply_immediate};
pub use command::{ConsensusEvent, ServerCommand, ServerEvent};
pub use error::{Result, ServerError};
pub use machine::{
    spawn_block_production_timer, spawn_child_sync_timer, ServerMachine, TimerHandle,
    DEFAULT_BLOCK_INTERVAL, DEFAULT_SYNC_INTERVAL,
};
