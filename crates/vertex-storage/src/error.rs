//! Storage error types.

use thiserror::Error;

/// Errors that can occur during blob store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred talking to the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be (de)serialized to/from its stored bytes.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested key was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend reported an internal failure (e.g. RocksDB).
    #[error("backend error: {0}")]
    Backend(String),
}

/// A specialized Result type for blob store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
