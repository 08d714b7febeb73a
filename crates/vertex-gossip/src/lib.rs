//! # vertex-gossip
//!
//! Peer-to-peer fan-out of blocks and state updates over a
//! connection-oriented transport, with liveness probing, peer
//! discovery, de-duplicated block relay, and asynchronous parent
//! back-fill for nodes that fall behind.
//!
//! `GossipTransport<C>` is generic over the command payload `C`
//! carried by the blocks it relays (the same parameter every
//! `vertex-machine`-backed submachine uses), so one transport instance
//! can serve a `Block<ServerCommand>` network without this crate
//! knowing anything about server, signer, or entity semantics — it
//! only needs `C: Serialize + DeserializeOwned` to move bytes, and a
//! block/state handler registered by the caller to apply them.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod handler;
mod link;
mod message;
mod peer;
mod protocol;
mod transport;

pub use error::{GossipError, Result};
pub use handler::{BlockHandler, BlockRequestHandler, StateHandler};
pub use link::{InMemoryLink, PeerLink, TcpLink};
pub use message::{Envelope, MessageType, NodeInfo};
pub use peer::{PeerRecord, PeerState};
pub use protocol::{block_dedup_key, fork_choice, ForkChoice};
pub use transport::{GossipConfig, GossipTransport};
