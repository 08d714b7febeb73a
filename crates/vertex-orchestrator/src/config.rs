//! The bootstrap config list spec.md §6 describes: one entry per node,
//! `{ id, type, privateKey, peers, port, host, isBootstrap? }`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vertex_types::MachineId;

/// The lower bound on block-production cadence spec.md §6 states
/// ("Block production interval must be ≥1000 ms").
pub const MIN_BLOCK_PRODUCTION_INTERVAL_MS: u64 = 1000;

/// What role a bootstrap entry plays in the hierarchy. `Other` covers
/// a server or channel-only participant that does not itself produce
/// blocks on the orchestrator's signer-tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A `SignerMachine`, ticked by the block-production loop.
    Signer,
    /// An `EntityMachine`.
    Entity,
    /// Anything else (server, observer).
    Other,
}

/// One bootstrap entry. Private key material is never carried in the
/// config itself — only the name of the environment variable it is
/// sourced from, per spec.md §6's "private keys are sourced from
/// environment and loaded into KeyStore at start".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's machine id.
    pub id: MachineId,
    /// The node's role.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Name of the environment variable holding this node's hex-encoded
    /// secp256k1 secret key.
    pub private_key_env: String,
    /// Ids of the peers this node dials or accepts at bootstrap.
    #[serde(default)]
    pub peers: Vec<MachineId>,
    /// The TCP port this node's gossip transport listens on.
    pub port: u16,
    /// The host/interface this node's gossip transport binds to.
    pub host: String,
    /// Whether this node is one of the well-known bootstrap peers
    /// other nodes dial first.
    #[serde(default)]
    pub is_bootstrap: bool,
}

/// Errors in a [`NetworkConfig`] caught before any node is constructed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No nodes were listed.
    #[error("bootstrap config lists no nodes")]
    Empty,
    /// Two entries share the same id.
    #[error("duplicate node id {0}")]
    DuplicateId(MachineId),
    /// A peer reference does not name a listed node.
    #[error("node {0} lists unknown peer {1}")]
    UnknownPeer(MachineId, MachineId),
    /// The configured block-production interval is below the 1000 ms floor.
    #[error("block production interval {0}ms is below the 1000ms floor")]
    BlockIntervalTooShort(u64),
}

/// The full network configuration: the bootstrap node list plus the
/// timing parameters the orchestrator's ticks run on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-node bootstrap entries.
    pub nodes: Vec<NodeConfig>,
    /// Interval between block-production ticks, in milliseconds. Must
    /// be at least [`MIN_BLOCK_PRODUCTION_INTERVAL_MS`].
    pub block_production_interval_ms: u64,
    /// Interval between health-check ticks, in milliseconds.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

fn default_health_check_interval_ms() -> u64 {
    5_000
}

impl NetworkConfig {
    /// Validates node-list invariants and the block-production floor.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`]'s variants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Empty);
        }
        if self.block_production_interval_ms < MIN_BLOCK_PRODUCTION_INTERVAL_MS {
            return Err(ConfigError::BlockIntervalTooShort(self.block_production_interval_ms));
        }

        let mut seen = std::collections::BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.clone()) {
                return Err(ConfigError::DuplicateId(node.id.clone()));
            }
        }
        for node in &self.nodes {
            for peer in &node.peers {
                if !seen.contains(peer) {
                    return Err(ConfigError::UnknownPeer(node.id.clone(), peer.clone()));
                }
            }
        }
        Ok(())
    }

    /// The ids of every node configured with [`NodeKind::Signer`].
    #[must_use]
    pub fn signer_ids(&self) -> Vec<MachineId> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Signer)
            .map(|n| n.id.clone())
            .collect()
    }

    /// [`Self::block_production_interval_ms`] as a [`Duration`].
    #[must_use]
    pub fn block_production_interval(&self) -> Duration {
        Duration::from_millis(self.block_production_interval_ms)
    }

    /// [`Self::health_check_interval_ms`] as a [`Duration`].
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}
