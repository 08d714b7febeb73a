//! Simulated network conditions the orchestrator can impose on a node,
//! for exercising gossip resilience without a real unreliable network.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use vertex_types::MachineId;

/// A simulated condition applied to one node's outbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCondition {
    /// Normal operation.
    Healthy,
    /// Every send is delayed by the given duration before delivery.
    Latency(Duration),
    /// The node is cut off: every send is silently dropped.
    Partitioned,
    /// The node is down entirely; health checks should treat it as dead.
    Offline,
}

impl Default for NetworkCondition {
    fn default() -> Self {
        Self::Healthy
    }
}

/// A process-wide table of per-node simulated conditions, consulted by
/// the orchestrator's tick loop before each gossip send or
/// block-production attempt.
#[derive(Default)]
pub struct ConditionTable {
    conditions: RwLock<HashMap<MachineId, NetworkCondition>>,
}

impl ConditionTable {
    /// Builds an empty table; every node starts [`NetworkCondition::Healthy`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `node`'s simulated condition, replacing any previous one.
    pub fn set(&self, node: MachineId, condition: NetworkCondition) {
        self.conditions.write().insert(node, condition);
    }

    /// Restores `node` to [`NetworkCondition::Healthy`].
    pub fn clear(&self, node: &MachineId) {
        self.conditions.write().remove(node);
    }

    /// Returns `node`'s current condition, defaulting to `Healthy`.
    #[must_use]
    pub fn get(&self, node: &MachineId) -> NetworkCondition {
        self.conditions.read().get(node).copied().unwrap_or_default()
    }

    /// Whether `node` should be skipped entirely this tick
    /// (`Partitioned` or `Offline`).
    #[must_use]
    pub fn is_unreachable(&self, node: &MachineId) -> bool {
        matches!(self.get(node), NetworkCondition::Partitioned | NetworkCondition::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_healthy() {
        let table = ConditionTable::new();
        assert_eq!(table.get(&MachineId::new("n1")), NetworkCondition::Healthy);
        assert!(!table.is_unreachable(&MachineId::new("n1")));
    }

    #[test]
    fn partitioned_node_is_unreachable() {
        let table = ConditionTable::new();
        let id = MachineId::new("n1");
        table.set(id.clone(), NetworkCondition::Partitioned);
        assert!(table.is_unreachable(&id));
        table.clear(&id);
        assert!(!table.is_unreachable(&id));
    }
}
