//! The wire envelope: length-prefixed JSON, exactly the fields spec.md
//! §4.9/§6 define.

use serde::{Deserialize, Serialize};
use vertex_types::{Block, Hash, MachineId};

/// The ten envelope kinds a [`crate::GossipTransport`] exchanges with
/// its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Sent on accept, carrying the sender's [`NodeInfo`].
    Handshake,
    /// A gossiped block.
    Block,
    /// A gossiped state update (out-of-band of block inclusion).
    StateUpdate,
    /// A liveness probe, sent every 30s per connected peer.
    Ping,
    /// The expected reply to a `PING`, within 5s.
    Pong,
    /// Asks a peer for its known peer list.
    RequestPeers,
    /// A reply to `REQUEST_PEERS`.
    PeersList,
    /// Unsolicited announcement of this node's presence, used during
    /// initial bootstrap alongside `REQUEST_PEERS`.
    Discovery,
    /// Asks a peer for a block by hash (parent back-fill).
    RequestBlock,
    /// A reply to `REQUEST_BLOCK`.
    BlockResponse,
}

/// Self-description a node sends in its `HANDSHAKE` (and advertises in
/// `PEERS_LIST` responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// The node's machine id, doubling as its peer id.
    pub id: MachineId,
    /// The address other peers should dial to reach this node, if
    /// known (absent for purely in-process/test peers).
    pub address: Option<String>,
}

impl NodeInfo {
    /// Builds a `NodeInfo` with no advertised address (in-process peer).
    #[must_use]
    pub fn unaddressed(id: MachineId) -> Self {
        Self { id, address: None }
    }
}

/// The payload carried by an [`Envelope`], one variant per
/// [`MessageType`]. Kept as a single enum (rather than `type` +
/// untyped `payload`) so `serde` statically guarantees the payload
/// shape matches its discriminant; the wire form still serializes as
/// `{ "type": ..., "payload": ... }` via `#[serde(tag, content)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope<C> {
    /// [`MessageType::Handshake`].
    Handshake(NodeInfo),
    /// [`MessageType::Block`].
    Block(Block<C>),
    /// [`MessageType::StateUpdate`]: a machine's self-reported root.
    StateUpdate {
        /// The machine whose root changed.
        machine_id: MachineId,
        /// The new state root.
        state_root: Hash,
    },
    /// [`MessageType::Ping`].
    Ping,
    /// [`MessageType::Pong`].
    Pong,
    /// [`MessageType::RequestPeers`].
    RequestPeers,
    /// [`MessageType::PeersList`].
    PeersList(Vec<NodeInfo>),
    /// [`MessageType::Discovery`].
    Discovery(NodeInfo),
    /// [`MessageType::RequestBlock`].
    RequestBlock {
        /// The missing parent's digest.
        parent_hash: Hash,
    },
    /// [`MessageType::BlockResponse`]: `None` if the responder doesn't
    /// have the requested block either.
    BlockResponse(Option<Block<C>>),
}

impl<C> Envelope<C> {
    /// Returns this envelope's [`MessageType`] discriminant.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Handshake(_) => MessageType::Handshake,
            Self::Block(_) => MessageType::Block,
            Self::StateUpdate { .. } => MessageType::StateUpdate,
            Self::Ping => MessageType::Ping,
            Self::Pong => MessageType::Pong,
            Self::RequestPeers => MessageType::RequestPeers,
            Self::PeersList(_) => MessageType::PeersList,
            Self::Discovery(_) => MessageType::Discovery,
            Self::RequestBlock { .. } => MessageType::RequestBlock,
            Self::BlockResponse(_) => MessageType::BlockResponse,
        }
    }
}
