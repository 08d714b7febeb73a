//! The pure state transition a `SignerMachine` applies per transaction,
//! shared by `produce_block`, `receive_block`, and replay.

use crate::command::SignerCommand;
use crate::error::{Result, SignerError};
use tracing::debug;
use vertex_crypto::KeyStore;
use vertex_types::{Canonicalize, MachineId, Message, SignerState};

/// Applies an ordered batch of signer commands to `state`.
///
/// `self_id` is the machine signing on behalf of itself — the private
/// key looked up in `keystore` is always `self_id`'s, since a
/// `SignerMachine` only ever signs with its own key regardless of
/// which transaction it is asked to sign.
pub fn apply<C>(
    state: &mut SignerState<C>,
    keystore: &KeyStore,
    self_id: &MachineId,
    messages: &[Message<SignerCommand<C>>],
) -> Result<()>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    for message in messages {
        apply_one(state, keystore, self_id, &message.sender, &message.payload)?;
    }
    Ok(())
}

fn apply_one<C>(
    state: &mut SignerState<C>,
    keystore: &KeyStore,
    self_id: &MachineId,
    sender: &MachineId,
    command: &SignerCommand<C>,
) -> Result<()>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    match command {
        SignerCommand::CreateEntity { entity_id } => {
            let nonce = state.base.nonces.get(sender).copied().unwrap_or(0) + 1;
            state.base.nonces.insert(sender.clone(), nonce);
            debug!(%entity_id, "signer recorded entity creation");
            Ok(())
        }
        SignerCommand::ReceiveTransaction { transaction } => {
            let digest = transaction.digest();
            state.pending_transactions.insert(digest, transaction.clone());
            Ok(())
        }
        SignerCommand::SignTransaction { tx_hash } => {
            let signed = state
                .pending_transactions
                .get_mut(tx_hash)
                .ok_or(SignerError::UnknownTransaction(*tx_hash))?;
            let digest = signed.digest();
            if digest != *tx_hash {
                return Err(SignerError::UnknownTransaction(*tx_hash));
            }

            let signature = keystore.sign(self_id, digest.as_bytes())?;
            let public_key = keystore.public_key(self_id)?;
            public_key
                .verify_prehash(digest.as_bytes(), &signature)
                .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

            signed
                .partial_signatures
                .insert(public_key.to_string(), signature.to_string());
            debug!(%tx_hash, signer = %public_key, "signed pending transaction");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::{MessageKind, SignedTransaction};

    fn sample_message(sender: &str, payload: SignerCommand<u64>) -> Message<SignerCommand<u64>> {
        Message::new(
            MessageKind::Command,
            MachineId::new(sender),
            MachineId::new("signer-1"),
            payload,
            0,
        )
    }

    #[test]
    fn create_entity_bumps_senders_nonce() {
        let keystore = KeyStore::new();
        let self_id = MachineId::new("signer-1");
        keystore.generate(self_id.clone());
        let mut state: SignerState<u64> = SignerState::default();

        let msg = sample_message(
            "operator",
            SignerCommand::CreateEntity {
                entity_id: MachineId::new("entity-1"),
            },
        );
        apply(&mut state, &keystore, &self_id, &[msg]).unwrap();
        assert_eq!(state.base.nonces.get(&MachineId::new("operator")), Some(&1));
    }

    #[test]
    fn sign_transaction_rejects_unknown_hash() {
        let keystore = KeyStore::new();
        let self_id = MachineId::new("signer-1");
        keystore.generate(self_id.clone());
        let mut state: SignerState<u64> = SignerState::default();

        let msg = sample_message(
            "operator",
            SignerCommand::SignTransaction {
                tx_hash: vertex_types::Hash::digest(b"ghost"),
            },
        );
        let err = apply(&mut state, &keystore, &self_id, &[msg]).unwrap_err();
        assert!(matches!(err, SignerError::UnknownTransaction(_)));
    }

    #[test]
    fn sign_transaction_stores_a_verifying_partial_signature() {
        let keystore = KeyStore::new();
        let self_id = MachineId::new("signer-1");
        let public_key = keystore.generate(self_id.clone());
        let mut state: SignerState<u64> = SignerState::default();

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx = SignedTransaction::new(inner);
        let digest = tx.digest();

        apply(
            &mut state,
            &keystore,
            &self_id,
            &[sample_message(
                "entity-1",
                SignerCommand::ReceiveTransaction { transaction: tx },
            )],
        )
        .unwrap();
        apply(
            &mut state,
            &keystore,
            &self_id,
            &[sample_message(
                "entity-1",
                SignerCommand::SignTransaction { tx_hash: digest },
            )],
        )
        .unwrap();

        let signed = state.pending_transactions.get(&digest).unwrap();
        let sig_hex = signed.partial_signatures.get(&public_key.to_string()).unwrap();
        assert_eq!(sig_hex.len(), 128);
    }

    #[test]
    fn signing_the_same_transaction_twice_is_deterministic() {
        let keystore = KeyStore::new();
        let self_id = MachineId::new("signer-1");
        keystore.generate(self_id.clone());

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx = SignedTransaction::new(inner);
        let digest = tx.digest();

        let mut state_a: SignerState<u64> = SignerState::default();
        apply(
            &mut state_a,
            &keystore,
            &self_id,
            &[
                sample_message("entity-1", SignerCommand::ReceiveTransaction { transaction: tx.clone() }),
                sample_message("entity-1", SignerCommand::SignTransaction { tx_hash: digest }),
            ],
        )
        .unwrap();

        let mut state_b: SignerState<u64> = SignerState::default();
        apply(
            &mut state_b,
            &keystore,
            &self_id,
            &[
                sample_message("entity-1", SignerCommand::ReceiveTransaction { transaction: tx }),
                sample_message("entity-1", SignerCommand::SignTransaction { tx_hash: digest }),
            ],
        )
        .unwrap();

        assert_eq!(
            state_a.pending_transactions[&digest].partial_signatures,
            state_b.pending_transactions[&digest].partial_signatures,
        );
    }
}
