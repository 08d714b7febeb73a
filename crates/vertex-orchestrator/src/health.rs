//! Per-node liveness bookkeeping the orchestrator's health-check tick
//! updates and a dashboard (via `vertex-dashboard`) would render.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use vertex_types::MachineId;

/// A node is considered unhealthy once this many milliseconds pass
/// without a block-production attempt or gossip liveness signal.
pub const DEFAULT_STALE_AFTER_MS: i64 = 30_000;

/// One node's last-observed liveness.
#[derive(Debug, Clone, Copy)]
pub struct HealthStatus {
    /// The chain height this node last reported.
    pub last_height: u64,
    /// Unix milliseconds of the last tick this node participated in.
    pub last_seen_at: i64,
    /// Whether the node is currently considered healthy.
    pub healthy: bool,
}

impl HealthStatus {
    fn fresh(now: i64) -> Self {
        Self {
            last_height: 0,
            last_seen_at: now,
            healthy: true,
        }
    }
}

/// Tracks [`HealthStatus`] per node across ticks.
#[derive(Default)]
pub struct HealthMonitor {
    statuses: RwLock<BTreeMap<MachineId, HealthStatus>>,
}

impl HealthMonitor {
    /// Builds a monitor with no nodes tracked yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `node` produced or accepted a block at `height`
    /// as of `now`, marking it healthy.
    pub fn record_activity(&self, node: MachineId, height: u64, now: i64) {
        let mut statuses = self.statuses.write();
        let entry = statuses.entry(node).or_insert_with(|| HealthStatus::fresh(now));
        entry.last_height = height;
        entry.last_seen_at = now;
        entry.healthy = true;
    }

    /// Re-evaluates every tracked node against `now`, marking any node
    /// whose last activity is older than `stale_after_ms` as
    /// unhealthy. Returns the ids that flipped from healthy to
    /// unhealthy this sweep.
    pub fn sweep(&self, now: i64, stale_after_ms: i64) -> Vec<MachineId> {
        let mut flipped = Vec::new();
        let mut statuses = self.statuses.write();
        for (id, status) in statuses.iter_mut() {
            let stale = now.saturating_sub(status.last_seen_at) > stale_after_ms;
            if stale && status.healthy {
                status.healthy = false;
                flipped.push(id.clone());
            } else if !stale {
                status.healthy = true;
            }
        }
        flipped
    }

    /// Returns a snapshot of every tracked node's current status.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<MachineId, HealthStatus> {
        self.statuses.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_activity_is_healthy() {
        let monitor = HealthMonitor::new();
        let id = MachineId::new("s1");
        monitor.record_activity(id.clone(), 5, 1_000);
        assert!(monitor.snapshot()[&id].healthy);
    }

    #[test]
    fn stale_node_flips_unhealthy_on_sweep() {
        let monitor = HealthMonitor::new();
        let id = MachineId::new("s1");
        monitor.record_activity(id.clone(), 5, 1_000);

        let flipped = monitor.sweep(1_000 + DEFAULT_STALE_AFTER_MS + 1, DEFAULT_STALE_AFTER_MS);
        assert_eq!(flipped, vec![id.clone()]);
        assert!(!monitor.snapshot()[&id].healthy);
    }

    #[test]
    fn recovering_activity_flips_back_to_healthy() {
        let monitor = HealthMonitor::new();
        let id = MachineId::new("s1");
        monitor.record_activity(id.clone(), 5, 1_000);
        monitor.sweep(1_000 + DEFAULT_STALE_AFTER_MS + 1, DEFAULT_STALE_AFTER_MS);
        monitor.record_activity(id.clone(), 6, 1_000 + DEFAULT_STALE_AFTER_MS + 2);
        assert!(monitor.snapshot()[&id].healthy);
    }
}
