//! Errors surfaced while bootstrapping or driving a [`crate::Network`].

use crate::config::ConfigError;
use vertex_types::MachineId;

/// A failure building or ticking a network. Per spec.md §7,
/// orchestrator-level failures (invalid configuration, transport
/// construction failure) abort startup — these are the variants that
/// do so; per-node production failures are logged and degrade that
/// node instead of propagating here.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The supplied [`crate::NetworkConfig`] failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A node's `private_key_env` variable was not set.
    #[error("missing required environment variable {0} for node {1}")]
    MissingKey(String, MachineId),
    /// A node's environment-sourced private key was not valid hex or
    /// not a valid secp256k1 scalar.
    #[error("invalid private key for node {0}: {1}")]
    InvalidKey(MachineId, String),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
