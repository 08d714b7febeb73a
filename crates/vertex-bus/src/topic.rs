//! Type-indexed fan-out topic tagging for bus payloads.

/// Tags a bus payload with the topic subscribers fan out on.
///
/// Implemented once per process-wide envelope type (the union of every
/// machine kind's command/event payloads), so a single `subscribe`
/// call can register for, say, `"PROPOSAL_EXECUTED"` without caring
/// which concrete machine emitted it.
pub trait Topic {
    /// Returns the topic this payload fans out on.
    fn topic(&self) -> &'static str;
}
