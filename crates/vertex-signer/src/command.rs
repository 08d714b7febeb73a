//! The command set a `SignerMachine` accepts, and the bus events it emits.

use serde::{Deserialize, Serialize};
use vertex_bus::Topic;
use vertex_types::{Canonicalize, Hash, MachineId, SignedTransaction};

/// Commands recognized by a `SignerMachine`, carried as the payload of
/// `Message<SignerCommand<C>>` and admitted into its own mempool like
/// every other submachine — including `SIGN_TRANSACTION`, so that the
/// deterministic RFC-6979 signature produced lands inside a replayable
/// block rather than as an out-of-band side effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignerCommand<C> {
    /// Records that this signer participated in creating `entity_id`,
    /// bumping its own per-sender nonce.
    CreateEntity {
        /// The entity that was created.
        entity_id: MachineId,
    },
    /// Hands a transaction awaiting signatures into this signer's
    /// `pendingTransactions`, keyed by its canonical digest.
    ReceiveTransaction {
        /// The transaction to track.
        transaction: SignedTransaction<C>,
    },
    /// Signs the pending transaction with digest `tx_hash` and stores
    /// the partial signature keyed by this signer's public key.
    SignTransaction {
        /// Digest of the transaction to sign, as returned by
        /// `SignedTransaction::digest`.
        tx_hash: Hash,
    },
}

impl<C: Canonicalize> Canonicalize for SignerCommand<C>
where
    vertex_types::Message<C>: Canonicalize,
{
    fn canonicalize(&self) -> Vec<u8> {
        match self {
            Self::CreateEntity { entity_id } => {
                let mut out = vec![0u8];
                out.extend(entity_id.canonicalize());
                out
            }
            Self::ReceiveTransaction { transaction } => {
                let mut out = vec![1u8];
                out.extend(transaction.canonicalize());
                out
            }
            Self::SignTransaction { tx_hash } => {
                let mut out = vec![2u8];
                out.extend(tx_hash.canonicalize());
                out
            }
        }
    }
}

impl<C> Topic for SignerCommand<C> {
    fn topic(&self) -> &'static str {
        match self {
            Self::CreateEntity { .. } => "CREATE_ENTITY",
            Self::ReceiveTransaction { .. } => "RECEIVE_TRANSACTION",
            Self::SignTransaction { .. } => "SIGN_TRANSACTION",
        }
    }
}

/// Events a `SignerMachine` broadcasts after a command has taken
/// effect, so dashboards and tests can observe signing without polling
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignerEvent {
    /// `tx_hash`'s partial signature set now includes this signer.
    TransactionSigned {
        /// The signed transaction's digest.
        tx_hash: Hash,
        /// Hex-encoded public key that produced the signature.
        signer: String,
    },
}

impl Topic for SignerEvent {
    fn topic(&self) -> &'static str {
        match self {
            Self::TransactionSigned { .. } => "TRANSACTION_SIGNED",
        }
    }
}

