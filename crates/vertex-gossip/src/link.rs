//! The abstract wire: something a [`crate::GossipTransport`] can send
//! framed bytes over. [`TcpLink`] is the production implementation
//! (length-prefixed JSON over TCP, matching the "websocket-compatible
//! transport" wire format of spec.md §6); [`InMemoryLink`] wires two
//! in-process transports together for tests and the simulator without
//! touching a socket.

use crate::error::{GossipError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// One direction of a connection to a single peer: send raw envelope
/// bytes (already-serialized JSON) to it.
#[async_trait]
pub trait PeerLink: Send + Sync {
    /// Sends `bytes` to the peer at the other end of this link.
    ///
    /// # Errors
    ///
    /// Returns [`GossipError::Io`] on a transient send failure. Per
    /// spec.md §4.9, callers treat this as peer removal, not a fatal
    /// broadcast failure.
    async fn send(&self, bytes: Bytes) -> Result<()>;
}

/// A length-delimited, JSON-framed TCP link — the length-prefixed
/// envelope framing spec.md §6 describes, carried over a plain TCP
/// socket standing in for the "websocket-compatible transport".
pub struct TcpLink {
    sink: tokio::sync::Mutex<futures_util::stream::SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>>,
}

impl TcpLink {
    /// Wraps an established TCP stream as a peer link, splitting it
    /// into an owned send half (the receive half is driven by the
    /// transport's accept loop, not this type).
    #[must_use]
    pub fn new(stream: TcpStream) -> (Self, futures_util::stream::SplitStream<Framed<TcpStream, LengthDelimitedCodec>>) {
        let framed = Framed::new(stream, LengthDelimitedCodec::new());
        let (sink, stream) = framed.split();
        (
            Self {
                sink: tokio::sync::Mutex::new(sink),
            },
            stream,
        )
    }
}

#[async_trait]
impl PeerLink for TcpLink {
    async fn send(&self, bytes: Bytes) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(bytes)
            .await
            .map_err(|e| GossipError::Io(std::io::Error::other(e)))
    }
}

/// Decodes one length-delimited frame's bytes into a `BytesMut` buffer
/// boundary-safe slice, for callers reading off a `TcpLink`'s receive
/// half directly.
pub fn frame_to_bytes(frame: BytesMut) -> Bytes {
    frame.freeze()
}

/// An in-process link backed by an unbounded channel, used to wire
/// two [`crate::GossipTransport`] instances together in tests and in
/// the orchestrator's single-process simulator without a real socket.
pub struct InMemoryLink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl InMemoryLink {
    /// Builds a connected pair: `(link, receiver)` where bytes sent
    /// through `link` arrive on `receiver`.
    #[must_use]
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PeerLink for InMemoryLink {
    async fn send(&self, bytes: Bytes) -> Result<()> {
        self.tx
            .send(bytes)
            .map_err(|_| GossipError::Io(std::io::Error::other("peer channel closed")))
    }
}
