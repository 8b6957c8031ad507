//! Convertly Storage Library
//!
//! Key-value storage with per-entry expiry, backing the upload store and the
//! job tracker. Two backends: in-process memory and the local filesystem.
//!
//! # Key format
//!
//! - Upload content: `uploads/{file_id}/data`
//! - Upload metadata: `uploads/{file_id}/meta.json`
//! - Job records: `jobs/{job_id}.json`
//!
//! Keys must not be empty, contain `..` or start with `/`. Key generation is
//! centralized in the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

pub use convertly_core::StorageBackend;
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};
