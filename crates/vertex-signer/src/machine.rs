//! `SignerMachine`: a `MachineCore` specialized to sign transactions on
//! a block-by-block basis, plus the `ActorRunner` glue that admits
//! incoming bus commands into its mempool.

use crate::apply::apply;
use crate::command::SignerCommand;
use crate::error::{Result, SignerError};
use std::sync::Arc;
use vertex_bus::MachineHandler;
use vertex_crypto::{KeyStore, PublicKey};
use vertex_machine::MachineCore;
use vertex_types::{Block, Canonicalize, MachineEvent, MachineId, Message, SignerState};

/// A single-keypair participant: wraps a [`MachineCore`] over
/// [`SignerState`] and the [`KeyStore`] its `SIGN_TRANSACTION` apply
/// step reads from.
pub struct SignerMachine<C> {
    /// The shared produce/receive/verify pipeline.
    pub core: MachineCore<SignerState<C>, SignerCommand<C>>,
    keystore: Arc<KeyStore>,
}

impl<C> SignerMachine<C>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    /// Builds a fresh signer machine, registering its public key into
    /// `SignerState::public_key`.
    #[must_use]
    pub fn new(
        self_id: MachineId,
        public_key: PublicKey,
        keystore: Arc<KeyStore>,
        mempool_capacity: usize,
    ) -> Self {
        let state = SignerState {
            public_key: public_key.to_string(),
            ..SignerState::default()
        };
        Self {
            core: MachineCore::new(self_id, state, mempool_capacity),
            keystore,
        }
    }

    /// Admits a command into this signer's mempool.
    ///
    /// # Errors
    ///
    /// Returns an error if the mempool is at capacity.
    pub fn admit(
        &mut self,
        command: Message<SignerCommand<C>>,
        gas_price: u64,
        now: i64,
    ) -> Result<vertex_types::Hash> {
        self.core.admit(command, gas_price, now).map_err(SignerError::Machine)
    }

    /// Produces a block over this signer's pending commands.
    ///
    /// # Errors
    ///
    /// See [`MachineCore::produce_block`].
    pub fn produce_block(
        &mut self,
        now: u64,
        max_transactions: usize,
    ) -> Result<Block<SignerCommand<C>>> {
        let keystore = self.keystore.clone();
        let self_id = self.core.self_id.clone();
        self.core
            .produce_block(self_id.clone(), now, max_transactions, move |state, txs| {
                apply(state, &keystore, &self_id, txs)
            })
            .map_err(SignerError::Machine)
    }

    /// Validates and commits a block produced by this signer elsewhere
    /// (e.g. replayed from the journal, or received from a peer
    /// replica of the same signer).
    ///
    /// # Errors
    ///
    /// See [`MachineCore::receive_block`].
    pub fn receive_block(&mut self, block: &Block<SignerCommand<C>>) -> Result<()> {
        let keystore = self.keystore.clone();
        let self_id = self.core.self_id.clone();
        self.core
            .receive_block(block, move |state, txs| apply(state, &keystore, &self_id, txs))
            .map_err(SignerError::Machine)
    }
}

impl<C> MachineHandler<SignerCommand<C>> for SignerMachine<C>
where
    C: Canonicalize + Clone + Send + 'static,
    Message<C>: Canonicalize,
{
    type Error = SignerError;

    fn handle(&mut self, event: MachineEvent<SignerCommand<C>>) -> Result<()> {
        let message = Message::command(
            event.sender,
            self.core.self_id.clone(),
            event.payload,
            event.timestamp,
        );
        self.admit(message, 0, event.timestamp).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::{MessageKind, SignedTransaction};

    fn command_message(payload: SignerCommand<u64>) -> Message<SignerCommand<u64>> {
        Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("signer-1"),
            payload,
            1000,
        )
    }

    #[test]
    fn produce_then_receive_signs_a_pending_transaction() {
        let keystore = Arc::new(KeyStore::new());
        let self_id = MachineId::new("signer-1");
        let public_key = keystore.generate(self_id.clone());
        let mut producer: SignerMachine<u64> =
            SignerMachine::new(self_id.clone(), public_key, keystore, 10);

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            42u64,
            0,
        );
        let tx = SignedTransaction::new(inner);
        let digest = tx.digest();

        producer
            .admit(
                command_message(SignerCommand::ReceiveTransaction { transaction: tx }),
                0,
                1000,
            )
            .unwrap();
        producer
            .admit(
                command_message(SignerCommand::SignTransaction { tx_hash: digest }),
                0,
                1001,
            )
            .unwrap();

        let block = producer.produce_block(1000, 10).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert!(producer.core.state.pending_transactions[&digest]
            .partial_signatures
            .contains_key(&public_key.to_string()));
    }
}
