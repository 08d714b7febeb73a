//! Runtime configuration for the bootstrap binary: the network's
//! bootstrap list (spec.md §6) plus the operational settings that sit
//! around it (log level, data directory), loadable from a file and
//! overridable by environment variables.
//!
//! ## Environment variables
//!
//! | Variable               | Description                  | Default |
//! |-------------------------|-------------------------------|---------|
//! | `VERTEX_LOG_LEVEL`       | `tracing` log level          | `info`  |
//! | `VERTEX_DATA_DIR`        | Data directory (unused by the in-memory blob store, reserved for a persistent one) | `./data` |
//! | `VERTEX_MAX_TRANSACTIONS`| Max transactions sealed per block | `64` |
//! | `VERTEX_MEMPOOL_CAPACITY`| Per-signer mempool capacity  | `1024`  |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;
use vertex_orchestrator::NetworkConfig;

/// Configuration-loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents could not be parsed as YAML or JSON.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A loaded config failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the bootstrap binary needs beyond the network itself.
///
/// `network` is validated separately via [`NetworkConfig::validate`]
/// (an inherent method on a type this crate doesn't own, so it can't
/// be reached through `validator`'s `#[validate(nested)]`); the fields
/// below are validated through the derive as usual.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuntimeConfig {
    /// The network's bootstrap node list and tick intervals.
    pub network: NetworkConfig,

    /// `tracing` log level (`error`/`warn`/`info`/`debug`/`trace`).
    #[validate(custom(function = "validate_log_level"))]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory reserved for a persistent blob store backend.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum transactions sealed per produced block.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,

    /// Per-signer mempool capacity.
    #[validate(range(min = 1))]
    #[serde(default = "default_mempool_capacity")]
    pub mempool_capacity: usize,
}

fn validate_log_level(level: &str) -> Result<(), validator::ValidationError> {
    match level {
        "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_log_level")),
    }
}

fn default_log_level() -> String {
    std::env::var("VERTEX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

fn default_data_dir() -> PathBuf {
    std::env::var("VERTEX_DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./data"))
}

fn default_max_transactions() -> usize {
    std::env::var("VERTEX_MAX_TRANSACTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(64)
}

fn default_mempool_capacity() -> usize {
    std::env::var("VERTEX_MEMPOOL_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(1024)
}

impl validator::Validate for NetworkConfig {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        NetworkConfig::validate(self).map_err(|err| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("network", validator::ValidationError::new("invalid_network_config").with_message(err.to_string().into()));
            errors
        })
    }
}

impl RuntimeConfig {
    /// Loads and parses a config file (YAML unless `path` ends in
    /// `.json`), then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file can't be read,
    /// [`ConfigError::Parse`] if it's malformed, or
    /// [`ConfigError::Invalid`] if it fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?
        };

        config.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_network_with_no_nodes() {
        let config = RuntimeConfig {
            network: NetworkConfig {
                nodes: vec![],
                block_production_interval_ms: 2000,
                health_check_interval_ms: 5000,
            },
            log_level: "info".into(),
            data_dir: PathBuf::from("./data"),
            max_transactions: 64,
            mempool_capacity: 1024,
        };
        assert!(config.validate().is_err());
    }
}
