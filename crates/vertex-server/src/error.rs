//! Errors surfaced by [`crate::ServerMachine`].

use vertex_types::MachineId;

/// A rejected server command.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `ProcessBlock`, `SyncState`, or `UpdateChildState` named a child
    /// this server has never registered via `CreateSigner`.
    #[error("unknown child submachine {0}")]
    UnknownChild(MachineId),
    /// The underlying block pipeline rejected the operation.
    #[error(transparent)]
    Machine(#[from] vertex_machine::MachineError),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, ServerError>;
