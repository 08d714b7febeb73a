//! Errors surfaced by [`crate::SignerMachine`].

use vertex_types::Hash;

/// A rejected signer command.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// `SIGN_TRANSACTION` referenced a hash absent from `pendingTransactions`.
    #[error("unknown transaction {0}")]
    UnknownTransaction(Hash),
    /// No key is registered for this signer in the `KeyStore`.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),
    /// A freshly produced signature failed to verify against its own
    /// public key; this should be unreachable for a correctly
    /// constructed `Keypair` and indicates a canonicalization bug.
    #[error("signature failed self-verification: {0}")]
    InvalidSignature(String),
    /// The underlying block pipeline rejected the operation (e.g. a
    /// full mempool).
    #[error(transparent)]
    Machine(#[from] vertex_machine::MachineError),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, SignerError>;

impl From<vertex_crypto::IdentityError> for SignerError {
    fn from(err: vertex_crypto::IdentityError) -> Self {
        Self::KeyUnavailable(err.to_string())
    }
}
