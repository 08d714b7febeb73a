//! `GossipTransport<C>`: peer lifecycle, liveness probing, de-duplicated
//! block relay, and parent back-fill (spec.md §4.9).

use crate::error::Result;
use crate::handler::{BlockHandler, BlockRequestHandler, StateHandler};
use crate::link::PeerLink;
use crate::message::{Envelope, MessageType, NodeInfo};
use crate::peer::{PeerRecord, PeerState};
use crate::protocol::block_dedup_key;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use vertex_core::Timestamp;
use vertex_types::{Block, Hash, MachineId};

/// Dials an unknown peer learned about via `PEERS_LIST`. Real dialing
/// (opening a TCP connection, framing it as a [`crate::TcpLink`]) is
/// transport-specific, so the transport delegates it rather than
/// owning a socket factory itself.
#[async_trait]
pub trait PeerDialer: Send + Sync {
    /// Connects to the peer described by `info`.
    async fn dial(&self, info: NodeInfo);
}

/// Tuning knobs for one [`GossipTransport`] instance.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// This node's own id, used as the `HANDSHAKE` sender and excluded
    /// from relay fan-out.
    pub self_id: MachineId,
    /// Interval between `PING` rounds (spec.md default: 30s).
    pub ping_interval: Duration,
    /// How long to wait for a `PONG` before marking a peer inactive
    /// (spec.md default: 5s).
    pub pong_timeout: Duration,
}

impl GossipConfig {
    /// Builds a config for `self_id` using the spec's default
    /// 30s/5s ping/pong cadence.
    #[must_use]
    pub fn new(self_id: MachineId) -> Self {
        Self {
            self_id,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(5),
        }
    }
}

/// Peer-to-peer fan-out of blocks and state updates, generic over the
/// command payload `C` carried by gossiped blocks.
pub struct GossipTransport<C> {
    config: GossipConfig,
    peers: RwLock<HashMap<MachineId, PeerRecord>>,
    links: RwLock<HashMap<MachineId, Arc<dyn PeerLink>>>,
    seen_blocks: RwLock<HashSet<String>>,
    block_handlers: RwLock<Vec<Arc<dyn BlockHandler<C>>>>,
    state_handlers: RwLock<Vec<Arc<dyn StateHandler>>>,
    block_request_handlers: RwLock<Vec<Arc<dyn BlockRequestHandler<C>>>>,
    dialer: RwLock<Option<Arc<dyn PeerDialer>>>,
}

impl<C> GossipTransport<C>
where
    C: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
{
    /// Builds a transport with no peers and no registered handlers.
    #[must_use]
    pub fn new(config: GossipConfig) -> Self {
        Self {
            config,
            peers: RwLock::new(HashMap::new()),
            links: RwLock::new(HashMap::new()),
            seen_blocks: RwLock::new(HashSet::new()),
            block_handlers: RwLock::new(Vec::new()),
            state_handlers: RwLock::new(Vec::new()),
            block_request_handlers: RwLock::new(Vec::new()),
            dialer: RwLock::new(None),
        }
    }

    /// Registers a block handler. Must happen before gossip traffic
    /// starts flowing (spec.md §5): these lists are append-only.
    pub fn register_block_handler(&self, handler: Arc<dyn BlockHandler<C>>) {
        self.block_handlers.write().push(handler);
    }

    /// Registers a state-update handler.
    pub fn register_state_handler(&self, handler: Arc<dyn StateHandler>) {
        self.state_handlers.write().push(handler);
    }

    /// Registers a handler answering `REQUEST_BLOCK` from local storage.
    pub fn register_block_request_handler(&self, handler: Arc<dyn BlockRequestHandler<C>>) {
        self.block_request_handlers.write().push(handler);
    }

    /// Registers the callback used to dial peers discovered via
    /// `PEERS_LIST`.
    pub fn set_dialer(&self, dialer: Arc<dyn PeerDialer>) {
        *self.dialer.write() = Some(dialer);
    }

    /// Registers an already-connected peer and sends it our
    /// `HANDSHAKE`. The peer starts `Connecting` until its own
    /// `HANDSHAKE` is received by [`Self::handle_envelope`].
    ///
    /// # Errors
    ///
    /// Propagates a transient send failure from `link`.
    pub async fn add_peer(
        &self,
        id: MachineId,
        address: Option<String>,
        link: Arc<dyn PeerLink>,
    ) -> Result<()> {
        self.peers
            .write()
            .insert(id.clone(), PeerRecord::connecting(id.clone(), address));
        self.links.write().insert(id.clone(), link);
        self.send_to(&id, &Envelope::<C>::Handshake(self.self_info())).await
    }

    /// Returns this node's own [`NodeInfo`].
    #[must_use]
    pub fn self_info(&self) -> NodeInfo {
        NodeInfo::unaddressed(self.config.self_id.clone())
    }

    /// Returns the ids of peers currently marked `Active`.
    #[must_use]
    pub fn active_peers(&self) -> Vec<MachineId> {
        self.peers
            .read()
            .values()
            .filter(|p| p.state == PeerState::Active)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Returns `id`'s current lifecycle state, if known.
    #[must_use]
    pub fn peer_state(&self, id: &MachineId) -> Option<PeerState> {
        self.peers.read().get(id).map(|p| p.state)
    }

    /// Announces a locally-produced block: applies it through the
    /// registered block handlers and relays it to every connected
    /// peer. Routed through the identical path an incoming `BLOCK`
    /// envelope takes (minus the "except sender" exclusion, since a
    /// local production has no sender), per spec.md §4.9's "local and
    /// remote deliveries are indistinguishable".
    pub async fn announce_block(&self, block: Block<C>) {
        self.accept_and_relay(block, None).await;
    }

    /// Handles one decoded envelope received from `from`.
    ///
    /// Unknown message types cannot occur (the envelope is a typed
    /// enum), matching spec.md §4.9's "unknown message types are
    /// ignored" intent at the boundary where raw bytes fail to decode
    /// (handled by the caller before this is invoked).
    pub async fn handle_envelope(&self, from: MachineId, envelope: Envelope<C>) {
        match envelope {
            Envelope::Handshake(info) => self.on_handshake(from, info).await,
            Envelope::Block(block) => self.accept_and_relay(block, Some(from)).await,
            Envelope::StateUpdate {
                machine_id,
                state_root,
            } => {
                for handler in self.state_handlers.read().iter() {
                    handler.on_state_update(&machine_id, state_root);
                }
            }
            Envelope::Ping => {
                let _ = self.send_to(&from, &Envelope::<C>::Pong).await;
            }
            Envelope::Pong => {
                if let Some(peer) = self.peers.write().get_mut(&from) {
                    peer.last_pong_received = Some(Timestamp::now().as_millis());
                }
            }
            Envelope::RequestPeers => {
                let list: Vec<NodeInfo> = self
                    .peers
                    .read()
                    .values()
                    .filter(|p| p.state == PeerState::Active && p.id != from)
                    .map(|p| NodeInfo {
                        id: p.id.clone(),
                        address: p.address.clone(),
                    })
                    .collect();
                let _ = self.send_to(&from, &Envelope::<C>::PeersList(list)).await;
            }
            Envelope::PeersList(infos) => self.on_peers_list(infos).await,
            Envelope::Discovery(info) => self.on_handshake(from, info).await,
            Envelope::RequestBlock { parent_hash } => {
                let found = self
                    .block_request_handlers
                    .read()
                    .iter()
                    .find_map(|h| h.block_by_hash(&parent_hash));
                let _ = self
                    .send_to(&from, &Envelope::BlockResponse(found))
                    .await;
            }
            Envelope::BlockResponse(Some(block)) => {
                self.accept_and_relay(block, Some(from)).await;
            }
            Envelope::BlockResponse(None) => {
                debug!(peer = %from, "parent back-fill miss: peer doesn't have it either");
            }
        }
    }

    async fn on_handshake(&self, from: MachineId, info: NodeInfo) {
        let is_new = {
            let mut peers = self.peers.write();
            let entry = peers
                .entry(from.clone())
                .or_insert_with(|| PeerRecord::connecting(from.clone(), info.address.clone()));
            let was_active = entry.state == PeerState::Active;
            entry.state = PeerState::Active;
            entry.address = info.address.clone();
            !was_active
        };
        if is_new {
            let _ = self.send_to(&from, &Envelope::<C>::RequestPeers).await;
        }
    }

    async fn on_peers_list(&self, infos: Vec<NodeInfo>) {
        let dialer = self.dialer.read().clone();
        let Some(dialer) = dialer else { return };
        let unknown: Vec<NodeInfo> = {
            let peers = self.peers.read();
            infos
                .into_iter()
                .filter(|info| info.id != self.config.self_id && !peers.contains_key(&info.id))
                .collect()
        };
        for info in unknown {
            dialer.dial(info).await;
        }
    }

    /// De-duplicates by `BLOCK:{hash}`: the first time a hash is seen
    /// (whether gossiped in, parent-back-filled, or produced locally
    /// via [`Self::announce_block`]), it is handed to every registered
    /// [`BlockHandler`] and relayed to every active peer except
    /// `from`. A handler whose own [`crate::BlockRequestHandler`]-backed
    /// chain can't yet link the block (parent unknown) is expected to
    /// call [`Self::request_parent`] itself — the transport only
    /// applies spec.md §4.9's fork-choice rule as the pure function
    /// `crate::fork_choice` exported for that purpose, since block
    /// linkage is chain state the transport does not own.
    async fn accept_and_relay(&self, block: Block<C>, from: Option<MachineId>) {
        let hash = block.id();
        let key = block_dedup_key(&hash);
        {
            let mut seen = self.seen_blocks.write();
            if !seen.insert(key) {
                debug!(block = %hash, "duplicate block, dropping");
                return;
            }
        }

        for handler in self.block_handlers.read().iter() {
            handler.on_block(&block);
        }
        self.relay(&block, from.as_ref()).await;
    }

    /// Issues `REQUEST_BLOCK{parent_hash}` to `peer` (or, absent a
    /// known source peer, to every active peer) so a caller whose
    /// `verifyBlock`/`receiveBlock` pass rejected a block with
    /// `LinkMismatch` can back-fill the missing parent.
    pub async fn request_parent(&self, parent_hash: Hash, peer: Option<&MachineId>) {
        let envelope = Envelope::RequestBlock { parent_hash };
        match peer {
            Some(id) => {
                let _ = self.send_to(id, &envelope).await;
            }
            None => {
                for id in self.active_peers() {
                    let _ = self.send_to(&id, &envelope).await;
                }
            }
        }
    }

    async fn relay(&self, block: &Block<C>, except: Option<&MachineId>) {
        let targets: Vec<MachineId> = self
            .peers
            .read()
            .values()
            .filter(|p| p.state == PeerState::Active)
            .filter(|p| Some(&p.id) != except)
            .map(|p| p.id.clone())
            .collect();
        for target in targets {
            if let Err(err) = self
                .send_to(&target, &Envelope::Block(clone_block(block)))
                .await
            {
                warn!(peer = %target, cause = %err, "transient relay failure, dropping peer from active set");
                if let Some(peer) = self.peers.write().get_mut(&target) {
                    peer.state = PeerState::Inactive;
                }
            }
        }
    }

    /// Sends one `PING` to every active peer, marking overdue
    /// `PONG`s as a dropped (inactive) connection first. Intended to
    /// be called every [`GossipConfig::ping_interval`] by the owning
    /// runtime.
    pub async fn ping_tick(&self) {
        let now = Timestamp::now().as_millis();
        let timeout_ms = self.config.pong_timeout.as_millis() as i64;

        let overdue: Vec<MachineId> = self
            .peers
            .read()
            .values()
            .filter(|p| p.state == PeerState::Active && p.pong_overdue(now, timeout_ms))
            .map(|p| p.id.clone())
            .collect();
        for id in &overdue {
            warn!(peer = %id, "PONG timeout, marking peer inactive");
            if let Some(peer) = self.peers.write().get_mut(id) {
                peer.state = PeerState::Inactive;
            }
            self.links.write().remove(id);
        }

        let active = self.active_peers();
        for id in active {
            if let Some(peer) = self.peers.write().get_mut(&id) {
                peer.last_ping_sent = Some(now);
            }
            let _ = self.send_to(&id, &Envelope::<C>::Ping).await;
        }
    }

    async fn send_to(&self, target: &MachineId, envelope: &Envelope<C>) -> Result<()> {
        let link = { self.links.read().get(target).cloned() };
        let Some(link) = link else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(envelope)?;
        link.send(Bytes::from(bytes)).await
    }
}

fn clone_block<C: serde::Serialize + serde::de::DeserializeOwned>(block: &Block<C>) -> Block<C> {
    let bytes = serde_json::to_vec(block).expect("block serializes");
    serde_json::from_slice(&bytes).expect("block round-trips")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::InMemoryLink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vertex_types::{BlockHeader, MachineId, Message};

    fn test_block(number: u64, parent: Hash) -> Block<u64> {
        Block {
            header: BlockHeader {
                block_number: number,
                parent_hash: parent,
                proposer: MachineId::new("p"),
                timestamp: 0,
                transactions_root: Hash::GENESIS,
                state_root: Hash::GENESIS,
            },
            transactions: Vec::<Message<u64>>::new(),
            signatures: Vec::new(),
        }
    }

    struct CountingBlockHandler(Arc<AtomicUsize>);
    impl BlockHandler<u64> for CountingBlockHandler {
        fn on_block(&self, _block: &Block<u64>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn duplicate_blocks_apply_exactly_once() {
        let transport: GossipTransport<u64> = GossipTransport::new(GossipConfig::new(MachineId::new("n1")));
        let count = Arc::new(AtomicUsize::new(0));
        transport.register_block_handler(Arc::new(CountingBlockHandler(count.clone())));

        let block = test_block(1, Hash::GENESIS);
        transport.announce_block(block.clone()).await;
        transport.announce_block(block).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handshake_marks_peer_active_and_requests_peers() {
        let transport: GossipTransport<u64> = GossipTransport::new(GossipConfig::new(MachineId::new("n1")));
        let (link, mut rx) = InMemoryLink::pair();
        transport
            .add_peer(MachineId::new("n2"), None, Arc::new(link))
            .await
            .unwrap();

        // our own outbound HANDSHAKE
        let _ = rx.recv().await.unwrap();

        transport
            .handle_envelope(
                MachineId::new("n2"),
                Envelope::Handshake(NodeInfo::unaddressed(MachineId::new("n2"))),
            )
            .await;

        assert_eq!(transport.peer_state(&MachineId::new("n2")), Some(PeerState::Active));
        // REQUEST_PEERS should have been sent in response to the fresh handshake
        let sent: Envelope<u64> = serde_json::from_slice(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(sent.message_type(), MessageType::RequestPeers);
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let transport: GossipTransport<u64> = GossipTransport::new(GossipConfig::new(MachineId::new("n1")));
        let (link, mut rx) = InMemoryLink::pair();
        transport
            .add_peer(MachineId::new("n2"), None, Arc::new(link))
            .await
            .unwrap();
        let _ = rx.recv().await.unwrap(); // handshake

        transport
            .handle_envelope(MachineId::new("n2"), Envelope::<u64>::Ping)
            .await;

        let sent: Envelope<u64> = serde_json::from_slice(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(sent.message_type(), MessageType::Pong);
    }

    #[tokio::test]
    async fn block_is_relayed_to_peers_except_sender() {
        let transport: GossipTransport<u64> = GossipTransport::new(GossipConfig::new(MachineId::new("n1")));
        let (link_a, mut rx_a) = InMemoryLink::pair();
        let (link_b, mut rx_b) = InMemoryLink::pair();
        transport.add_peer(MachineId::new("a"), None, Arc::new(link_a)).await.unwrap();
        transport.add_peer(MachineId::new("b"), None, Arc::new(link_b)).await.unwrap();
        let _ = rx_a.recv().await.unwrap();
        let _ = rx_b.recv().await.unwrap();
        // mark both active via handshake
        transport.handle_envelope(MachineId::new("a"), Envelope::Handshake(NodeInfo::unaddressed(MachineId::new("a")))).await;
        transport.handle_envelope(MachineId::new("b"), Envelope::Handshake(NodeInfo::unaddressed(MachineId::new("b")))).await;
        let _ = rx_a.recv().await.unwrap(); // REQUEST_PEERS from a's handshake handling
        let _ = rx_b.recv().await.unwrap();

        transport
            .handle_envelope(MachineId::new("a"), Envelope::Block(test_block(1, Hash::GENESIS)))
            .await;

        // b receives the relay, a does not
        let relayed: Envelope<u64> = serde_json::from_slice(&rx_b.recv().await.unwrap()).unwrap();
        assert_eq!(relayed.message_type(), MessageType::Block);
        assert!(rx_a.try_recv().is_err());
    }
}
