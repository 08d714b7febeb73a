//! # vertex-dashboard
//!
//! The out-of-band observability feed spec.md §6 describes: a
//! dashboard consumer receives `{ node_states, node_configs }`
//! snapshots and a free-form log channel. This crate only defines
//! that contract and a small [`DashboardHub`] that fans it out over a
//! broadcast channel — it has no feedback path into the core, matches
//! spec.md §1's explicit scoping of "the developer dashboard UI and
//! websocket dashboard feed" to an external collaborator, and no
//! `vertex-*` core crate depends on it. A real web/websocket front end
//! would subscribe to [`DashboardHub::subscribe_snapshots`] and
//! [`DashboardHub::subscribe_logs`] and own its own transport; that
//! transport itself is out of scope here.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod event;
mod hub;

pub use event::{LogEntry, LogLevel, NetworkSnapshot, NodeConfigSummary, NodeState};
pub use hub::DashboardHub;
