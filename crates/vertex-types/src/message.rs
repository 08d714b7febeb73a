//! Bus messages and machine events.

use crate::machine_id::MachineId;
use crate::BROADCAST_ALL;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four message kinds routed through the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// A directive expected to produce a state change.
    Command,
    /// A notification that a state change already happened.
    Event,
    /// A read-only request for state.
    Query,
    /// A reply correlated to an earlier command or query.
    Response,
}

/// The recipient of a message: either one machine's mailbox, or every
/// registered machine (the `ALL` broadcast sentinel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipient {
    /// Addressed to exactly one machine.
    Direct(MachineId),
    /// Addressed to every machine registered on the bus.
    Broadcast,
}

impl Recipient {
    /// Returns the direct recipient, if this is not a broadcast.
    #[must_use]
    pub fn direct(&self) -> Option<&MachineId> {
        match self {
            Self::Direct(id) => Some(id),
            Self::Broadcast => None,
        }
    }
}

impl From<MachineId> for Recipient {
    fn from(id: MachineId) -> Self {
        Self::Direct(id)
    }
}

/// An immutable, typed message enqueued on the bus.
///
/// Once constructed and dispatched, a `Message` is never mutated —
/// only replaced by a fresh message bearing a new `correlation_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<P> {
    /// Unique message identifier.
    pub id: String,
    /// The message kind.
    pub kind: MessageKind,
    /// The typed payload.
    pub payload: P,
    /// The sending machine.
    pub sender: MachineId,
    /// The intended recipient.
    pub recipient: MachineId,
    /// Unix milliseconds at construction.
    pub timestamp: i64,
    /// Links a response back to the command/query that caused it.
    pub correlation_id: Option<String>,
    /// Links this message to the event that caused it to be produced.
    pub causation_id: Option<String>,
}

impl<P> Message<P> {
    /// Builds a new command message with a freshly generated id.
    pub fn command(sender: MachineId, recipient: MachineId, payload: P, timestamp: i64) -> Self {
        Self::new(MessageKind::Command, sender, recipient, payload, timestamp)
    }

    /// Builds a new message of the given kind with a freshly generated id.
    pub fn new(
        kind: MessageKind,
        sender: MachineId,
        recipient: MachineId,
        payload: P,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            sender,
            recipient,
            timestamp,
            correlation_id: None,
            causation_id: None,
        }
    }

    /// Returns a copy of this message tagged as a response to `self`.
    pub fn respond_with<R>(&self, payload: R, timestamp: i64) -> Message<R> {
        Message {
            id: Uuid::new_v4().to_string(),
            kind: MessageKind::Response,
            payload,
            sender: self.recipient.clone(),
            recipient: self.sender.clone(),
            timestamp,
            correlation_id: Some(self.id.clone()),
            causation_id: None,
        }
    }
}

/// A message that may target every registered machine rather than a
/// single mailbox, used for fan-out notifications (proposal lifecycle
/// events, block-finalized events, dashboard feeds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineEvent<P> {
    /// Unique event identifier.
    pub id: String,
    /// The event kind (always [`MessageKind::Event`] in practice, but
    /// carried explicitly to keep the shape symmetric with `Message`).
    pub kind: MessageKind,
    /// The typed payload.
    pub payload: P,
    /// The emitting machine.
    pub sender: MachineId,
    /// The intended recipient, which may be the broadcast sentinel.
    pub recipient: Recipient,
    /// Unix milliseconds at construction.
    pub timestamp: i64,
    /// Links this event to the command/query that caused it.
    pub causation_id: Option<String>,
}

impl<P> MachineEvent<P> {
    /// Builds a broadcast event (`recipient == ALL`).
    pub fn broadcast(sender: MachineId, payload: P, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: MessageKind::Event,
            payload,
            sender,
            recipient: Recipient::Broadcast,
            timestamp,
            causation_id: None,
        }
    }

    /// Returns whether this event targets every machine.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        matches!(self.recipient, Recipient::Broadcast)
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct(id) => write!(f, "{id}"),
            Self::Broadcast => write!(f, "{BROADCAST_ALL}"),
        }
    }
}
