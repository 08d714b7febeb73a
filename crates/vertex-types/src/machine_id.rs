//! Opaque machine identifiers.

use crate::canonical::Canonicalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, process-unique identifier for a submachine (Server,
/// Signer, Entity, or Channel).
///
/// `MachineId` deliberately carries no structure of its own: it is an
/// opaque stable string, so identifiers minted by different machine
/// kinds (random, hash-derived, or human-assigned) are all just
/// strings from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineId(String);

impl MachineId {
    /// Wraps a string as a `MachineId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MachineId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MachineId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Canonicalize for MachineId {
    fn canonicalize(&self) -> Vec<u8> {
        self.0.canonicalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_raw_string() {
        let id = MachineId::new("server-1");
        assert_eq!(id.to_string(), "server-1");
    }

    #[test]
    fn orders_lexicographically_for_sorted_maps() {
        let mut ids = vec![MachineId::new("b"), MachineId::new("a"), MachineId::new("c")];
        ids.sort();
        assert_eq!(ids, vec![MachineId::new("a"), MachineId::new("b"), MachineId::new("c")]);
    }
}
