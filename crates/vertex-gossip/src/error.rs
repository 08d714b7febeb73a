//! Gossip-layer error types.

use thiserror::Error;

/// Errors a [`crate::GossipTransport`] can report.
///
/// Per spec.md §4.9/§7 failure semantics: transient send errors and
/// malformed envelopes are never fatal to the node — they are logged
/// (by the caller, via `tracing`) and the offending peer is dropped
/// from the active set, but broadcast as a whole does not fail. This
/// error type exists for the handful of operations that *can* fail
/// outright: framing a connection, or looking up a peer that was
/// never registered.
#[derive(Debug, Error)]
pub enum GossipError {
    /// The peer referenced is not known to this transport.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// An envelope failed to decode.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The underlying connection failed to send or receive.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of an envelope failed.
    #[error("envelope (de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, GossipError>;
