//! Transaction-signature validation against an `EntityConfig`.
//!
//! Separate from the weighted-approval proposal DAG: this checks a
//! `SignedTransaction`'s own `partial_signatures`, letting a proposal
//! that already arrives with enough signer weight execute immediately
//! without waiting on further `APPROVE_PROPOSAL` votes.

use std::collections::BTreeMap;
use vertex_crypto::PublicKey;
use vertex_types::{Canonicalize, EntityConfig, Message, SignedTransaction};

/// The per-signer and aggregate result of checking a transaction's
/// `partial_signatures` against an `EntityConfig`.
#[derive(Debug, Clone, Default)]
pub struct TransactionValidation {
    /// `true` if the signer's entry (when present) verifies against
    /// the transaction's digest, `false` if present but invalid.
    /// Signers absent from `partial_signatures` have no entry here.
    pub per_signer: BTreeMap<String, bool>,
    /// Sum of the weights of signers whose signature verified.
    pub total_weight: u32,
    /// Whether `total_weight >= config.threshold`.
    pub meets_threshold: bool,
}

/// Checks every signer in `config.signers` that has an entry in
/// `tx.partial_signatures`, verifying each against
/// `H(canonical(tx.transaction))`.
///
/// Malformed hex or an invalid compressed public key is treated as a
/// failing (not verifying) signature rather than a hard error, so one
/// bad entry cannot block validation of the rest.
#[must_use]
pub fn validate_transaction<C>(tx: &SignedTransaction<C>, config: &EntityConfig) -> TransactionValidation
where
    C: Canonicalize,
    Message<C>: Canonicalize,
{
    let digest = tx.digest();
    let mut per_signer = BTreeMap::new();
    let mut total_weight = 0u32;

    for (signer_hex, weight) in &config.signers {
        let Some(sig_hex) = tx.partial_signatures.get(signer_hex) else {
            continue;
        };
        let valid = verify_hex_signature(signer_hex, digest.as_bytes(), sig_hex);
        if valid {
            total_weight += weight;
        }
        per_signer.insert(signer_hex.clone(), valid);
    }

    let meets_threshold = total_weight >= config.threshold;
    TransactionValidation {
        per_signer,
        total_weight,
        meets_threshold,
    }
}

fn verify_hex_signature(signer_hex: &str, digest: &[u8; 32], sig_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(signer_hex) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    if sig_bytes.len() != vertex_crypto::Signature::LEN {
        return false;
    }
    let signature = vertex_crypto::Signature::from_slice(&sig_bytes);
    public_key.verify_prehash(digest, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use vertex_crypto::KeyStore;
    use vertex_types::{MachineId, MessageKind};

    fn config(threshold: u32, signers: &[(&str, u32)]) -> EntityConfig {
        EntityConfig {
            threshold,
            signers: signers.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            admins: BTreeSet::new(),
        }
    }

    #[test]
    fn a_valid_signature_counts_its_weight() {
        let keystore = KeyStore::new();
        let signer_id = MachineId::new("signer-1");
        let public_key = keystore.generate(signer_id.clone());
        let key_hex = public_key.to_string();

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let mut tx = SignedTransaction::new(inner);
        let digest = tx.digest();
        let signature = keystore.sign(&signer_id, digest.as_bytes()).unwrap();
        tx.partial_signatures.insert(key_hex.clone(), signature.to_string());

        let cfg = config(1, &[(&key_hex, 3)]);
        let validation = validate_transaction(&tx, &cfg);
        assert_eq!(validation.per_signer.get(&key_hex), Some(&true));
        assert_eq!(validation.total_weight, 3);
        assert!(validation.meets_threshold);
    }

    #[test]
    fn a_garbled_signature_does_not_count_but_does_not_panic() {
        let cfg = config(1, &[("deadbeef", 5)]);
        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let mut tx = SignedTransaction::new(inner);
        tx.partial_signatures.insert("deadbeef".to_string(), "not-hex".to_string());

        let validation = validate_transaction(&tx, &cfg);
        assert_eq!(validation.per_signer.get("deadbeef"), Some(&false));
        assert_eq!(validation.total_weight, 0);
        assert!(!validation.meets_threshold);
    }

    #[test]
    fn an_absent_signer_has_no_entry() {
        let cfg = config(1, &[("abc", 1)]);
        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx: SignedTransaction<u64> = SignedTransaction::new(inner);
        let validation = validate_transaction(&tx, &cfg);
        assert!(validation.per_signer.is_empty());
    }
}
