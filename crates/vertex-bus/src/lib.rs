//! # vertex-bus
//!
//! The in-process transport binding every submachine together: an
//! [`EventBus`] that routes machine id → mailbox and fans events out to
//! type-indexed subscribers, and an [`ActorRunner`](runner) that drains
//! one machine's mailbox on its own cooperative schedule.
//!
//! Scheduling model: cooperative, message-passing. Each submachine
//! owns a private [`Mailbox`] and is driven by exactly one runner task.
//! Handlers see their state exclusively; multiple runners may execute
//! in parallel on different machines, but a single machine's events
//! are always processed in dispatch order (no cross-machine ordering
//! is guaranteed — consensus-relevant ordering is established only by
//! block linkage).

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod bus;
mod mailbox;
mod runner;
mod topic;

pub use bus::EventBus;
pub use mailbox::Mailbox;
pub use runner::{spawn, MachineHandler, RunnerConfig, RunnerHandle};
pub use topic::Topic;
