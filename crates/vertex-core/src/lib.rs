//! # vertex-core
//!
//! Foundational types, traits, and error definitions shared across the
//! vertex hierarchy of machines (server, signer, entity, channel).
//!
//! This crate provides the building blocks every other `vertex-*` crate
//! depends on, without pulling in anything specific to a single machine
//! kind.
//!
//! ## Features
//!
//! - A common error type with rich context ([`Error`])
//! - Millisecond-precision [`Timestamp`]
//! - Serialization and verification traits shared by the machine hierarchy
//!
//! ## Example
//!
//! ```rust
//! use vertex_core::{Error, Result};
//!
//! fn lookup(id: &str) -> Result<()> {
//!     Err(Error::not_found("machine", id))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod timestamp;
pub mod traits;

pub use error::{Error, Result};
pub use timestamp::Timestamp;
