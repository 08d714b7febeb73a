//! `Network<C>`: builds a set of `SignerMachine`s wired together over
//! in-process `GossipTransport`s from a [`NetworkConfig`], and drives
//! the block-production/health-check ticks spec.md §4.10 describes.

use crate::condition::{ConditionTable, NetworkCondition};
use crate::config::{NetworkConfig, NodeKind};
use crate::error::Result;
use crate::health::HealthMonitor;
use crate::{bootstrap, topology};
use bytes::Bytes;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vertex_crypto::KeyStore;
use vertex_gossip::{Envelope, GossipConfig, GossipTransport, InMemoryLink};
use vertex_machine::MachineError;
use vertex_signer::{SignerCommand, SignerError, SignerMachine};
use vertex_types::{Canonicalize, MachineId, Message};

/// One signer node as the orchestrator sees it: its machine plus the
/// gossip transport fanning its blocks out to peers.
struct SignerNode<C> {
    machine: Mutex<SignerMachine<C>>,
    transport: Arc<GossipTransport<SignerCommand<C>>>,
}

/// A running, single-process simulated network of signer nodes, built
/// from a [`NetworkConfig`] and shared [`KeyStore`].
///
/// Non-signer bootstrap entries (`entity`/`other`) are accepted by
/// [`NetworkConfig::validate`] but are not driven by this type's
/// block-production loop; they are the concern of the hierarchy
/// (`vertex-hierarchy`, `vertex-entity`) layered on top by whatever
/// binary embeds this orchestrator (spec.md's bootstrap binary).
pub struct Network<C> {
    config: NetworkConfig,
    keystore: Arc<KeyStore>,
    nodes: HashMap<MachineId, SignerNode<C>>,
    pub health: HealthMonitor,
    pub conditions: ConditionTable,
}

impl<C> Network<C>
where
    C: Canonicalize + Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned,
    Message<C>: Canonicalize,
{
    /// Builds a network: validates `config`, loads every node's key
    /// from its environment, constructs a `SignerMachine` and
    /// `GossipTransport` per signer entry, and wires peers according
    /// to each entry's `peers` list via in-process links.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OrchestratorError::Config`] if `config` fails
    /// validation, or a key-loading error if any signer's environment
    /// variable is missing or invalid.
    pub fn build(config: NetworkConfig, mempool_capacity: usize) -> Result<Self> {
        config.validate()?;
        let keystore = Arc::new(KeyStore::new());
        bootstrap::load_all_keys(&config.nodes, &keystore)?;

        let mut nodes = HashMap::new();
        for node_cfg in config.nodes.iter().filter(|n| n.kind == NodeKind::Signer) {
            let public_key = keystore.public_key(&node_cfg.id).expect("key just loaded");
            let machine = SignerMachine::new(node_cfg.id.clone(), public_key, keystore.clone(), mempool_capacity);
            let transport = Arc::new(GossipTransport::new(GossipConfig::new(node_cfg.id.clone())));
            nodes.insert(
                node_cfg.id.clone(),
                SignerNode {
                    machine: Mutex::new(machine),
                    transport,
                },
            );
        }

        let network = Self {
            config,
            keystore,
            nodes,
            health: HealthMonitor::new(),
            conditions: ConditionTable::new(),
        };
        network.wire_peers();
        Ok(network)
    }

    /// Connects every pair of signer nodes named in each other's
    /// `peers` list with an [`InMemoryLink`] pair, and spawns a task
    /// relaying each direction's bytes into the receiving transport's
    /// `handle_envelope`.
    fn wire_peers(&self) {
        let mut wired: std::collections::HashSet<(MachineId, MachineId)> = std::collections::HashSet::new();
        for node_cfg in &self.config.nodes {
            let Some(from) = self.nodes.get(&node_cfg.id) else { continue };
            for peer_id in &node_cfg.peers {
                let Some(to) = self.nodes.get(peer_id) else { continue };
                let pair_key = if node_cfg.id < *peer_id {
                    (node_cfg.id.clone(), peer_id.clone())
                } else {
                    (peer_id.clone(), node_cfg.id.clone())
                };
                if !wired.insert(pair_key) {
                    continue;
                }
                self.link(&node_cfg.id, from, peer_id, to);
            }
        }
    }

    /// Generates a peer graph from [`topology::generate_peers`] and
    /// connects it the same way [`Self::wire_peers`] does, on top of
    /// whatever the bootstrap config already specified. Useful when a
    /// config lists nodes without peers and the caller wants a
    /// uniform mesh/ring/star shape instead.
    pub fn apply_topology(&self, topology: topology::Topology, center: Option<&MachineId>) {
        let ids: Vec<MachineId> = self.nodes.keys().cloned().collect();
        let graph = topology::generate_peers(&ids, topology, center);
        let mut wired: std::collections::HashSet<(MachineId, MachineId)> = std::collections::HashSet::new();
        for (id, peers) in &graph {
            let Some(from) = self.nodes.get(id) else { continue };
            for peer_id in peers {
                let Some(to) = self.nodes.get(peer_id) else { continue };
                let pair_key = if *id < *peer_id {
                    (id.clone(), peer_id.clone())
                } else {
                    (peer_id.clone(), id.clone())
                };
                if !wired.insert(pair_key) {
                    continue;
                }
                self.link(id, from, peer_id, to);
            }
        }
    }

    fn link(&self, a_id: &MachineId, a: &SignerNode<C>, b_id: &MachineId, b: &SignerNode<C>) {
        let (link_a_to_b, mut rx_b) = InMemoryLink::pair();
        let (link_b_to_a, mut rx_a) = InMemoryLink::pair();

        let a_transport = a.transport.clone();
        let b_transport = b.transport.clone();
        let added_a = a_transport.clone();
        let added_b = b_transport.clone();
        let a_id_owned = a_id.clone();
        let b_id_owned = b_id.clone();

        tokio::spawn(async move {
            let _ = added_a.add_peer(b_id_owned.clone(), None, Arc::new(link_a_to_b)).await;
        });
        let a_id_for_b = a_id.clone();
        let b_id_for_link = b_id.clone();
        tokio::spawn(async move {
            let _ = added_b.add_peer(a_id_for_b.clone(), None, Arc::new(link_b_to_a)).await;
        });

        let b_transport_recv = b_transport.clone();
        let a_id_sender = a_id.clone();
        tokio::spawn(async move {
            while let Some(bytes) = rx_b.recv().await {
                deliver(&b_transport_recv, &a_id_sender, bytes).await;
            }
        });
        let a_transport_recv = a_transport.clone();
        tokio::spawn(async move {
            while let Some(bytes) = rx_a.recv().await {
                deliver(&a_transport_recv, &b_id_for_link, bytes).await;
            }
        });
    }

    /// Runs one block-production tick: picks a uniformly random
    /// reachable signer, produces a block over its pending
    /// transactions, and announces it over that signer's gossip
    /// transport. A signer whose `NetworkCondition` makes it
    /// unreachable this tick is skipped silently, and an empty
    /// mempool is not an error (spec.md: "an empty mempool ... simply
    /// means nothing to seal this tick").
    pub async fn run_block_production_tick(&self, now_ms: u64, max_transactions: usize) {
        let reachable: Vec<MachineId> = self
            .nodes
            .keys()
            .filter(|id| !self.conditions.is_unreachable(id))
            .cloned()
            .collect();
        let Some(chosen) = reachable.choose(&mut rand::thread_rng()).cloned() else {
            return;
        };
        let Some(node) = self.nodes.get(&chosen) else { return };

        let produced = {
            let mut machine = node.machine.lock();
            machine.produce_block(now_ms, max_transactions)
        };

        match produced {
            Ok(block) => {
                let height = block.header.block_number;
                if let NetworkCondition::Latency(delay) = self.conditions.get(&chosen) {
                    tokio::time::sleep(delay).await;
                }
                node.transport.announce_block(block).await;
                self.health.record_activity(chosen.clone(), height, now_ms as i64);
                debug!(signer = %chosen, height, "signer sealed and announced a block");
            }
            Err(SignerError::Machine(MachineError::NoTransactions)) => {}
            Err(err) => warn!(signer = %chosen, cause = %err, "block production failed"),
        }
    }

    /// Runs one health-check sweep: marks any signer with no recorded
    /// activity in the last `stale_after_ms` as unhealthy, logging the
    /// transition for the dashboard feed.
    pub fn run_health_tick(&self, now_ms: i64, stale_after_ms: i64) {
        for id in self.health.sweep(now_ms, stale_after_ms) {
            warn!(node = %id, "node has gone unhealthy: no activity within the stale window");
        }
    }

    /// Sends a `PING` round on every signer's transport, the liveness
    /// half of spec.md §4.9's handshake/ping/pong protocol.
    pub async fn run_ping_tick(&self) {
        for node in self.nodes.values() {
            node.transport.ping_tick().await;
        }
    }

    /// Returns this network's configuration.
    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Returns the shared key store every signer's machine draws from.
    #[must_use]
    pub fn keystore(&self) -> &Arc<KeyStore> {
        &self.keystore
    }

    /// Returns `(height, tip_hash, pending_transaction_count)` for
    /// every signer node, keyed by id — everything an out-of-band
    /// dashboard feed (spec.md §6) needs to render a snapshot, without
    /// this crate taking a dependency on the dashboard's own types.
    #[must_use]
    pub fn signer_snapshot(&self) -> HashMap<MachineId, (u64, vertex_types::Hash, usize)> {
        self.nodes
            .iter()
            .map(|(id, node)| {
                let machine = node.machine.lock();
                let base = vertex_machine::HasBase::base(&machine.core.state);
                (id.clone(), (base.block_height, base.latest_hash, machine.core.mempool.current_size()))
            })
            .collect()
    }
}

async fn deliver<C>(transport: &Arc<GossipTransport<SignerCommand<C>>>, from: &MachineId, bytes: Bytes)
where
    C: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    match serde_json::from_slice::<Envelope<SignerCommand<C>>>(&bytes) {
        Ok(envelope) => transport.handle_envelope(from.clone(), envelope).await,
        Err(err) => {
            info!(peer = %from, cause = %err, "dropping malformed envelope");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use std::sync::Mutex as StdMutex;
    use vertex_crypto::Keypair;

    static ENV_LOCK: StdMutex<()> = StdMutex::new(());

    fn set_key_env(var: &str) {
        let secret = Keypair::generate().secret_bytes();
        std::env::set_var(var, hex::encode(&*secret));
    }

    fn two_node_config() -> NetworkConfig {
        NetworkConfig {
            nodes: vec![
                NodeConfig {
                    id: MachineId::new("s1"),
                    kind: NodeKind::Signer,
                    private_key_env: "VERTEX_NET_TEST_S1".into(),
                    peers: vec![MachineId::new("s2")],
                    port: 9001,
                    host: "127.0.0.1".into(),
                    is_bootstrap: true,
                },
                NodeConfig {
                    id: MachineId::new("s2"),
                    kind: NodeKind::Signer,
                    private_key_env: "VERTEX_NET_TEST_S2".into(),
                    peers: vec![MachineId::new("s1")],
                    port: 9002,
                    host: "127.0.0.1".into(),
                    is_bootstrap: false,
                },
            ],
            block_production_interval_ms: 1000,
            health_check_interval_ms: 5000,
        }
    }

    #[tokio::test]
    async fn builds_a_two_node_network_and_produces_an_empty_tick() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_key_env("VERTEX_NET_TEST_S1");
        set_key_env("VERTEX_NET_TEST_S2");

        let network: Network<u64> = Network::build(two_node_config(), 16).unwrap();
        // No pending transactions: the tick should be a no-op, not a panic.
        network.run_block_production_tick(1_000, 8).await;

        std::env::remove_var("VERTEX_NET_TEST_S1");
        std::env::remove_var("VERTEX_NET_TEST_S2");
    }

    #[tokio::test]
    async fn unreachable_signer_is_skipped() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_key_env("VERTEX_NET_TEST_S1B");
        set_key_env("VERTEX_NET_TEST_S2B");

        let mut config = two_node_config();
        config.nodes[0].private_key_env = "VERTEX_NET_TEST_S1B".into();
        config.nodes[1].private_key_env = "VERTEX_NET_TEST_S2B".into();

        let network: Network<u64> = Network::build(config, 16).unwrap();
        network.conditions.set(MachineId::new("s1"), NetworkCondition::Partitioned);
        network.conditions.set(MachineId::new("s2"), NetworkCondition::Partitioned);
        // Every signer unreachable: the tick must return without panicking.
        network.run_block_production_tick(1_000, 8).await;

        std::env::remove_var("VERTEX_NET_TEST_S1B");
        std::env::remove_var("VERTEX_NET_TEST_S2B");
    }

    #[tokio::test]
    async fn signer_snapshot_reports_every_signer_at_genesis() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_key_env("VERTEX_NET_TEST_S1C");
        set_key_env("VERTEX_NET_TEST_S2C");

        let mut config = two_node_config();
        config.nodes[0].private_key_env = "VERTEX_NET_TEST_S1C".into();
        config.nodes[1].private_key_env = "VERTEX_NET_TEST_S2C".into();

        let network: Network<u64> = Network::build(config, 16).unwrap();
        let snapshot = network.signer_snapshot();

        assert_eq!(snapshot.len(), 2);
        for (height, tip_hash, pending) in snapshot.values() {
            assert_eq!(*height, 0);
            assert_eq!(*tip_hash, vertex_types::Hash::GENESIS);
            assert_eq!(*pending, 0);
        }

        std::env::remove_var("VERTEX_NET_TEST_S1C");
        std::env::remove_var("VERTEX_NET_TEST_S2C");
    }
}
