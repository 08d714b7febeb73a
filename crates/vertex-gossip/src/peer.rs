//! Per-peer connection bookkeeping.

use vertex_types::MachineId;

/// The lifecycle state of one peer connection.
///
/// `Connecting` exists only between dialing and receiving the peer's
/// `HANDSHAKE`; every connection this transport accepted (rather than
/// initiated) starts directly at `Active` once the handshake lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Dialed but no `HANDSHAKE` received yet.
    Connecting,
    /// Handshake exchanged; eligible for broadcast and ping/pong.
    Active,
    /// Missed a `PONG` within the 5s deadline; socket has been closed.
    Inactive,
}

/// Everything this transport tracks about one connected peer.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    /// The peer's machine id.
    pub id: MachineId,
    /// The address to redial this peer at, if known.
    pub address: Option<String>,
    /// Current lifecycle state.
    pub state: PeerState,
    /// Unix milliseconds of the last `PING` sent to this peer.
    pub last_ping_sent: Option<i64>,
    /// Unix milliseconds of the last `PONG` received from this peer.
    pub last_pong_received: Option<i64>,
}

impl PeerRecord {
    /// Builds a freshly connecting peer record.
    #[must_use]
    pub fn connecting(id: MachineId, address: Option<String>) -> Self {
        Self {
            id,
            address,
            state: PeerState::Connecting,
            last_ping_sent: None,
            last_pong_received: None,
        }
    }

    /// Returns whether a `PONG` is overdue: a `PING` was sent more
    /// than `timeout_ms` ago with no `PONG` received since.
    #[must_use]
    pub fn pong_overdue(&self, now: i64, timeout_ms: i64) -> bool {
        match self.last_ping_sent {
            Some(sent) if now.saturating_sub(sent) > timeout_ms => match self.last_pong_received {
                Some(pong) => pong < sent,
                None => true,
            },
            _ => false,
        }
    }
}
