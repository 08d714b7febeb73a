//! # vertex-crypto
//!
//! secp256k1 key management and ECDSA signing for the vertex
//! hierarchy: the [`KeyStore`] that holds secret material, and the
//! [`SignatureEngine`] that signs and verifies over it.
//!
//! ## Example
//!
//! ```rust
//! use vertex_crypto::KeyStore;
//! use vertex_types::MachineId;
//!
//! let store = KeyStore::new();
//! let id = MachineId::new("signer-1");
//! let public_key = store.generate(id.clone());
//!
//! let digest = [0u8; 32];
//! let signature = store.sign(&id, &digest).unwrap();
//! assert!(public_key.verify_prehash(&digest, &signature).is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod keypair;
mod keystore;
mod public_key;
mod signature;
mod signature_engine;

pub use error::{IdentityError, Result};
pub use keypair::Keypair;
pub use keystore::KeyStore;
pub use public_key::PublicKey;
pub use signature::Signature;
pub use signature_engine::SignatureEngine;
