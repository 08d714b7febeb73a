//! The data shapes a dashboard consumer receives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vertex_types::{Amount, Hash, MachineId};

/// One node's observable state, as spec.md §6 defines it:
/// `{height, balances, tipHash, pendingTransactions?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    /// The node's current chain height.
    pub height: u64,
    /// Per-account balances this node tracks, if applicable to its
    /// machine kind (entities and channels have balances; servers and
    /// signers do not).
    pub balances: BTreeMap<MachineId, Amount>,
    /// The digest of the node's current chain tip.
    pub tip_hash: Hash,
    /// The number of transactions currently pending in this node's
    /// mempool, when the node chooses to report it.
    pub pending_transactions: Option<u64>,
}

/// A node's bootstrap configuration, summarized for display (no
/// private key material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigSummary {
    /// The node's machine id.
    pub id: MachineId,
    /// The node's declared role (`signer`, `entity`, `other`).
    pub role: String,
    /// The peer ids this node was configured to connect to.
    pub peers: Vec<MachineId>,
}

/// The full snapshot a dashboard consumer receives per tick:
/// `{ nodeStates, nodeConfigs }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Per-node observable state.
    pub node_states: BTreeMap<MachineId, NodeState>,
    /// Per-node bootstrap configuration summaries.
    pub node_configs: BTreeMap<MachineId, NodeConfigSummary>,
}

/// Severity of a [`LogEntry`], mirroring `tracing`'s levels so the
/// core's structured logs can be relayed verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// A failed operation, per spec.md §7's user-visible failure
    /// behavior: "dashboards receive a log entry with level ERROR and
    /// the failing operation's identifiers".
    Error,
    /// A notable but non-failing condition.
    Warn,
    /// Routine operational detail.
    Info,
}

/// One free-form log line relayed to the dashboard, carrying the
/// structured context spec.md §7 requires every runtime error to
/// have: `machineId`, `eventId`, `cause`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// The machine the message concerns, if any.
    pub machine_id: Option<MachineId>,
    /// The event/message id the log concerns, if any.
    pub event_id: Option<String>,
    /// Unix milliseconds at emission.
    pub timestamp: i64,
}

impl LogEntry {
    /// Builds an `ERROR`-level entry with full context, matching
    /// spec.md §7's required fields for a failing operation.
    #[must_use]
    pub fn error(
        message: impl Into<String>,
        machine_id: MachineId,
        event_id: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
            machine_id: Some(machine_id),
            event_id: Some(event_id.into()),
            timestamp,
        }
    }
}
