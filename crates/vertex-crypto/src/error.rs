//! Error types for key and signature operations.

use thiserror::Error;

/// Errors that can occur during key or signature operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The signature verification failed.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The public key is malformed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The secret key is malformed.
    #[error("invalid secret key")]
    InvalidSecretKey,

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// No private key is registered for the requested machine id.
    #[error("key unavailable for machine '{0}'")]
    KeyUnavailable(String),
}

/// A specialized Result type for key and signature operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
