//! Fans snapshots and log entries out to any number of dashboard
//! consumers over a broadcast channel, grounded in the teacher's
//! `EventHub` (`tokio::sync::broadcast`, same capacity convention).

use crate::event::{LogEntry, NetworkSnapshot};
use tokio::sync::broadcast;

/// Capacity of each broadcast channel, matching the teacher's
/// `EventHub::BROADCAST_CAPACITY`.
const BROADCAST_CAPACITY: usize = 1024;

/// The out-of-band sink an orchestrator or node publishes snapshots
/// and log entries to; a dashboard subscribes and renders. Nothing
/// here is read back by the core — publishing is fire-and-forget
/// (a lagged or absent subscriber never blocks or fails the caller).
pub struct DashboardHub {
    snapshots: broadcast::Sender<NetworkSnapshot>,
    logs: broadcast::Sender<LogEntry>,
}

impl DashboardHub {
    /// Builds a hub with no subscribers yet.
    #[must_use]
    pub fn new() -> Self {
        let (snapshots, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (logs, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { snapshots, logs }
    }

    /// Publishes a fresh network snapshot. Dropped silently if no
    /// receiver is currently subscribed.
    pub fn publish_snapshot(&self, snapshot: NetworkSnapshot) {
        let _ = self.snapshots.send(snapshot);
    }

    /// Publishes one log entry.
    pub fn publish_log(&self, entry: LogEntry) {
        let _ = self.logs.send(entry);
    }

    /// Subscribes to the snapshot feed.
    #[must_use]
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<NetworkSnapshot> {
        self.snapshots.subscribe()
    }

    /// Subscribes to the log feed.
    #[must_use]
    pub fn subscribe_logs(&self) -> broadcast::Receiver<LogEntry> {
        self.logs.subscribe()
    }
}

impl Default for DashboardHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LogLevel, NodeState};
    use std::collections::BTreeMap;
    use vertex_types::{Amount, Hash, MachineId};

    #[tokio::test]
    async fn subscriber_receives_published_snapshot() {
        let hub = DashboardHub::new();
        let mut rx = hub.subscribe_snapshots();

        let mut node_states = BTreeMap::new();
        node_states.insert(
            MachineId::new("server-1"),
            NodeState {
                height: 3,
                balances: BTreeMap::from([(MachineId::new("entity-1"), Amount::new(100))]),
                tip_hash: Hash::GENESIS,
                pending_transactions: Some(0),
            },
        );
        hub.publish_snapshot(NetworkSnapshot {
            node_states,
            node_configs: BTreeMap::new(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.node_states.len(), 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let hub = DashboardHub::new();
        hub.publish_log(LogEntry {
            level: LogLevel::Info,
            message: "no one is listening".into(),
            machine_id: None,
            event_id: None,
            timestamp: 0,
        });
    }
}
