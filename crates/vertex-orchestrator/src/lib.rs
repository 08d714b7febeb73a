//! # vertex-orchestrator
//!
//! Builds a running network from a bootstrap config list (spec.md
//! §6): loads each node's key into a shared [`vertex_crypto::KeyStore`],
//! constructs a `SignerMachine`/`GossipTransport` pair per signer
//! entry, wires them together (either from the config's own `peers`
//! lists or a generated [`topology::Topology`]), and drives the
//! block-production, health-check, and ping ticks a bootstrap binary
//! would schedule on a timer.
//!
//! Orchestrator-level failures — an invalid config, a missing or
//! malformed bootstrap key — abort construction outright (spec.md §7);
//! a single signer's production failure during a tick is logged and
//! degrades only that signer.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod bootstrap;
mod condition;
mod config;
mod error;
mod health;
mod network;
pub mod topology;

pub use condition::{ConditionTable, NetworkCondition};
pub use config::{ConfigError, NetworkConfig, NodeConfig, NodeKind, MIN_BLOCK_PRODUCTION_INTERVAL_MS};
pub use error::{OrchestratorError, Result};
pub use health::{HealthMonitor, HealthStatus, DEFAULT_STALE_AFTER_MS};
pub use network::Network;
pub use topology::Topology;
