//! # vertex-storage
//!
//! The opaque persistence layer described by the system's external
//! interfaces: a key-value [`BlobStore`] with no knowledge of block or
//! state shape, plus a typed [`BlockJournal`] convenience layer that
//! gives every machine kind `get`/`put`/`has_block`/`get_block_by_number`/
//! `get_latest_block`/`get_block_range` without re-deriving the key
//! scheme at each call site.
//!
//! The default backend is in-memory ([`MemoryBlobStore`]); an optional
//! `rocksdb-backend` feature adds [`RocksDbBlobStore`] for durable,
//! on-disk persistence. Neither backend is this crate's opinion to
//! enforce — callers choose at construction time by picking which
//! `Arc<dyn BlobStore>` to hand to [`BlockJournal::new`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod journal;
pub mod keys;
mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;
mod traits;

pub use error::{Result, StorageError};
pub use journal::BlockJournal;
pub use memory::MemoryBlobStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDbBlobStore;
pub use traits::BlobStore;
