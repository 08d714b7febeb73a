//! The process-wide secret holder.

use crate::{IdentityError, Keypair, PublicKey, Result, Signature};
use parking_lot::RwLock;
use std::collections::HashMap;
use vertex_types::MachineId;

/// Holds one keypair per machine id and answers private-key-bearing
/// requests (signing, public-key derivation) without ever handing the
/// secret material itself back to the caller.
///
/// `KeyStore` is read-mostly: writes are expected only at bootstrap,
/// when an operator loads each node's private key from its
/// environment, before any `SignerMachine` is constructed. It is
/// exposed as a plain, injectable value (wrapped in `Arc` by whoever
/// owns "the" process-wide instance) rather than a global static, so
/// tests can construct an isolated store per case.
#[derive(Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<MachineId, Keypair>>,
}

impl KeyStore {
    /// Builds an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a keypair for `machine_id`, overwriting any previous entry.
    pub fn register(&self, machine_id: MachineId, keypair: Keypair) {
        self.keys.write().insert(machine_id, keypair);
    }

    /// Generates a fresh keypair, registers it, and returns its public key.
    pub fn generate(&self, machine_id: MachineId) -> PublicKey {
        let keypair = Keypair::generate();
        let public_key = keypair.public_key();
        self.register(machine_id, keypair);
        public_key
    }

    /// Derives the public key registered for `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::KeyUnavailable`] if no key is registered.
    pub fn public_key(&self, machine_id: &MachineId) -> Result<PublicKey> {
        self.keys
            .read()
            .get(machine_id)
            .map(Keypair::public_key)
            .ok_or_else(|| IdentityError::KeyUnavailable(machine_id.to_string()))
    }

    /// Signs a 32-byte digest with the private key registered for `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::KeyUnavailable`] if no key is registered.
    pub fn sign(&self, machine_id: &MachineId, digest: &[u8; 32]) -> Result<Signature> {
        self.keys
            .read()
            .get(machine_id)
            .map(|kp| kp.sign_prehash(digest))
            .ok_or_else(|| IdentityError::KeyUnavailable(machine_id.to_string()))
    }

    /// Returns whether a key is registered for `machine_id`.
    #[must_use]
    pub fn contains(&self, machine_id: &MachineId) -> bool {
        self.keys.read().contains_key(machine_id)
    }

    /// Returns the number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Returns whether the store has no registered keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_sign_round_trips() {
        let store = KeyStore::new();
        let id = MachineId::new("signer-1");
        let public_key = store.generate(id.clone());

        let digest = [7u8; 32];
        let sig = store.sign(&id, &digest).unwrap();
        assert!(public_key.verify_prehash(&digest, &sig).is_ok());
    }

    #[test]
    fn unknown_machine_id_is_key_unavailable() {
        let store = KeyStore::new();
        let id = MachineId::new("ghost");
        assert!(matches!(
            store.public_key(&id),
            Err(IdentityError::KeyUnavailable(_))
        ));
    }
}
