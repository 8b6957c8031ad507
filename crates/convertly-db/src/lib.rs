//! Convertly record repositories
//!
//! The upload store and the job tracker, both persisted through an injected
//! [`convertly_storage::KeyValueStore`].

pub mod db;

pub use db::{JobRepository, KeyedLocks, UploadRepository};
