//! # vertex-signer
//!
//! `SignerMachine`: a single-keypair participant that signs pending
//! transactions referenced by hash out of its own mempool. Every
//! signature is produced deterministically (RFC-6979) over the raw
//! 32-byte canonical digest of the transaction, never its hex string.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod apply;
mod command;
mod error;
mod machine;

pub use command::{SignerCommand, SignerEvent};
pub use error::{Result, SignerError};
pub use machine::SignerMachine;
