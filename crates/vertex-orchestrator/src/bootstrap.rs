//! Loads each node's private key from its environment, per spec.md
//! §6: "Private keys are sourced from environment and loaded into
//! KeyStore at start."

use crate::config::NodeConfig;
use crate::error::{OrchestratorError, Result};
use vertex_crypto::{KeyStore, Keypair};

/// Reads `node.private_key_env` from the process environment (hex
/// encoded, 32 bytes) and registers the resulting keypair in
/// `keystore` under `node.id`.
///
/// # Errors
///
/// Returns [`OrchestratorError::MissingKey`] if the variable is unset,
/// or [`OrchestratorError::InvalidKey`] if it is not valid hex or not
/// a valid secp256k1 scalar.
pub fn load_node_key(node: &NodeConfig, keystore: &KeyStore) -> Result<()> {
    let hex_key = std::env::var(&node.private_key_env)
        .map_err(|_| OrchestratorError::MissingKey(node.private_key_env.clone(), node.id.clone()))?;
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| OrchestratorError::InvalidKey(node.id.clone(), e.to_string()))?;
    let keypair = Keypair::from_secret_bytes(&bytes)
        .map_err(|e| OrchestratorError::InvalidKey(node.id.clone(), e.to_string()))?;
    keystore.register(node.id.clone(), keypair);
    Ok(())
}

/// Loads every node's key in `nodes` into `keystore`, failing fast on
/// the first missing or invalid one (spec.md §7: "missing required
/// keys at bootstrap" is a non-zero-exit condition).
///
/// # Errors
///
/// See [`load_node_key`].
pub fn load_all_keys(nodes: &[NodeConfig], keystore: &KeyStore) -> Result<()> {
    for node in nodes {
        load_node_key(node, keystore)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeKind;
    use std::sync::Mutex;
    use vertex_types::MachineId;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn node(id: &str, env_var: &str) -> NodeConfig {
        NodeConfig {
            id: MachineId::new(id),
            kind: NodeKind::Signer,
            private_key_env: env_var.to_string(),
            peers: Vec::new(),
            port: 9000,
            host: "127.0.0.1".into(),
            is_bootstrap: false,
        }
    }

    #[test]
    fn missing_env_var_is_reported() {
        let _guard = ENV_LOCK.lock().unwrap();
        let keystore = KeyStore::new();
        let node = node("s1", "VERTEX_TEST_MISSING_KEY_VAR");
        std::env::remove_var(&node.private_key_env);
        assert!(matches!(
            load_node_key(&node, &keystore),
            Err(OrchestratorError::MissingKey(_, _))
        ));
    }

    #[test]
    fn valid_hex_key_registers_in_keystore() {
        let _guard = ENV_LOCK.lock().unwrap();
        let keystore = KeyStore::new();
        let node = node("s1", "VERTEX_TEST_VALID_KEY_VAR");
        let secret = Keypair::generate().secret_bytes();
        std::env::set_var(&node.private_key_env, hex::encode(&*secret));

        load_node_key(&node, &keystore).unwrap();
        assert!(keystore.contains(&node.id));
        std::env::remove_var(&node.private_key_env);
    }
}
