//! # vertex-hierarchy
//!
//! Pure, non-mutating functions that bind the Server → Signer → Entity
//! → Channel tree together: deriving a fresh Entity's id, attaching it
//! to its Server, connecting an additional Signer to an Entity, and
//! registering a machine's mailbox on the event bus. None of these
//! touch a handler or a block; they only produce the new value a
//! caller should commit.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

use std::sync::Arc;
use thiserror::Error;
use vertex_bus::{EventBus, Mailbox, Topic};
use vertex_types::{Canonicalize, ConfigValidationError, EntityConfig, EntityState, Hash, MachineId, ServerState};

/// The number of leading hex characters of the derivation hash kept
/// for a fresh entity id (16 hex chars = 8 bytes of the digest).
const ENTITY_ID_HEX_LEN: usize = 16;

/// A hierarchy operation was rejected.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The config handed to `create_entity_for_signer` or
    /// `connect_signer_to_entity` violates one of `EntityConfig`'s
    /// invariants.
    #[error("invalid entity config: {0:?}")]
    InvalidConfig(ConfigValidationError),
    /// The server already has a submachine registered under this id.
    #[error("submachine {0} is already attached")]
    AlreadyAttached(MachineId),
    /// The signer's public key is already present in the entity's config.
    #[error("signer {0} is already connected to this entity")]
    AlreadyConnected(String),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Derives a fresh entity id deterministically from the signer that is
/// creating it, the entity's starting config, and a timestamp:
/// `H(signer_id ∥ canonical(config) ∥ timestamp)`, truncated to the
/// first 16 hex characters (8 bytes) of the digest.
#[must_use]
pub fn derive_entity_id(signer_id: &MachineId, config: &EntityConfig, timestamp: i64) -> MachineId {
    let mut bytes = signer_id.canonicalize();
    bytes.extend(config.canonicalize());
    bytes.extend(timestamp.canonicalize());
    let hex = Hash::digest(&bytes).to_hex();
    MachineId::new(&hex[..ENTITY_ID_HEX_LEN])
}

/// Builds a fresh `EntityState` owned (initially) by `signer_id`,
/// deriving its id and delegating construction to `factory`.
///
/// # Errors
///
/// Returns [`HierarchyError::InvalidConfig`] if `config` fails
/// [`EntityConfig::validate`].
pub fn create_entity_for_signer<C>(
    signer_id: &MachineId,
    config: EntityConfig,
    timestamp: i64,
    factory: impl FnOnce(MachineId, EntityConfig) -> EntityState<C>,
) -> Result<(MachineId, EntityState<C>)> {
    config.validate().map_err(HierarchyError::InvalidConfig)?;
    let entity_id = derive_entity_id(signer_id, &config, timestamp);
    Ok((entity_id.clone(), factory(entity_id, config)))
}

/// Returns a copy of `server` with `entity_id` attached to
/// `submachines` (keyed by `H(canonical(entity.state))`) and appended
/// to `base.child_ids`.
///
/// # Errors
///
/// Returns [`HierarchyError::AlreadyAttached`] if `entity_id` is
/// already present in `server.submachines`.
pub fn attach_entity_to_server<C>(
    server: &ServerState,
    entity_id: &MachineId,
    entity: &EntityState<C>,
) -> Result<ServerState>
where
    EntityState<C>: Canonicalize,
{
    if server.submachines.contains_key(entity_id) {
        return Err(HierarchyError::AlreadyAttached(entity_id.clone()));
    }
    let mut next = server.clone();
    let entity_state_root = entity.canonical_hash();
    next.submachines.insert(entity_id.clone(), entity_state_root);
    next.base.child_ids.push(entity_id.clone());
    Ok(next)
}

/// Returns a copy of `entity` with `signer_public_key` added to
/// `config.signers` at `weight`, its state root implicitly advancing
/// since `EntityState::canonicalize` folds in `config`.
///
/// # Errors
///
/// Returns [`HierarchyError::AlreadyConnected`] if the key is already
/// a signer, or [`HierarchyError::InvalidConfig`] if the resulting
/// config would violate an invariant (e.g. a zero weight).
pub fn connect_signer_to_entity<C: Clone>(
    entity: &EntityState<C>,
    signer_public_key: String,
    weight: u32,
) -> Result<EntityState<C>> {
    if entity.config.signers.contains_key(&signer_public_key) {
        return Err(HierarchyError::AlreadyConnected(signer_public_key));
    }
    let mut next = entity.clone();
    next.config.signers.insert(signer_public_key, weight);
    next.config
        .validate()
        .map_err(HierarchyError::InvalidConfig)?;
    Ok(next)
}

/// Registers `machine_id` on `bus`, returning the mailbox it will
/// receive events on. A thin, explicitly-named delegation to
/// [`EventBus::register`] so call sites read as hierarchy operations
/// rather than bus plumbing.
pub fn register_entity_on_event_bus<P: Clone + Topic>(
    bus: &EventBus<P>,
    machine_id: MachineId,
) -> Arc<Mailbox<P>> {
    bus.register(machine_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use vertex_types::BaseMachineState;

    fn config(threshold: u32, signers: &[(&str, u32)]) -> EntityConfig {
        EntityConfig {
            threshold,
            signers: signers.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            admins: BTreeSet::new(),
        }
    }

    fn entity_state(config: EntityConfig) -> EntityState<u64> {
        EntityState {
            base: BaseMachineState::default(),
            config,
            channels: BTreeMap::new(),
            balance: vertex_types::Amount::ZERO,
            nonce: 0,
            proposals: BTreeMap::new(),
            pending_transactions: BTreeMap::new(),
        }
    }

    #[test]
    fn derive_entity_id_is_deterministic_and_16_hex_chars() {
        let cfg = config(1, &[("a", 1)]);
        let id1 = derive_entity_id(&MachineId::new("signer-1"), &cfg, 1000);
        let id2 = derive_entity_id(&MachineId::new("signer-1"), &cfg, 1000);
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str().len(), 16);
    }

    #[test]
    fn derive_entity_id_varies_with_timestamp() {
        let cfg = config(1, &[("a", 1)]);
        let id1 = derive_entity_id(&MachineId::new("signer-1"), &cfg, 1000);
        let id2 = derive_entity_id(&MachineId::new("signer-1"), &cfg, 1001);
        assert_ne!(id1, id2);
    }

    #[test]
    fn create_entity_for_signer_rejects_invalid_config() {
        let cfg = config(5, &[("a", 1)]);
        let err = create_entity_for_signer(&MachineId::new("signer-1"), cfg, 0, entity_state)
            .unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidConfig(_)));
    }

    #[test]
    fn attach_entity_to_server_updates_submachines_and_child_ids() {
        let server = ServerState::default();
        let entity = entity_state(config(1, &[("a", 1)]));
        let entity_id = MachineId::new("entity-1");

        let next = attach_entity_to_server(&server, &entity_id, &entity).unwrap();
        assert!(next.submachines.contains_key(&entity_id));
        assert_eq!(next.base.child_ids, vec![entity_id]);
    }

    #[test]
    fn attach_entity_to_server_rejects_duplicate_attachment() {
        let mut server = ServerState::default();
        let entity = entity_state(config(1, &[("a", 1)]));
        let entity_id = MachineId::new("entity-1");
        server.submachines.insert(entity_id.clone(), Hash::GENESIS);

        let err = attach_entity_to_server(&server, &entity_id, &entity).unwrap_err();
        assert!(matches!(err, HierarchyError::AlreadyAttached(_)));
    }

    #[test]
    fn connect_signer_to_entity_adds_weight_and_rehashes() {
        let entity = entity_state(config(1, &[("a", 1)]));
        let before_root = entity.canonical_hash();

        let next = connect_signer_to_entity(&entity, "b".to_string(), 2).unwrap();
        assert_eq!(next.config.signers.get("b"), Some(&2));
        assert_ne!(next.canonical_hash(), before_root);
    }

    #[test]
    fn connect_signer_to_entity_rejects_duplicate_signer() {
        let entity = entity_state(config(1, &[("a", 1)]));
        let err = connect_signer_to_entity(&entity, "a".to_string(), 2).unwrap_err();
        assert!(matches!(err, HierarchyError::AlreadyConnected(_)));
    }
}
