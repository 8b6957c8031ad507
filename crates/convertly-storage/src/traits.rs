//! Key-value store abstraction
//!
//! Every backend must implement [`KeyValueStore`]. Entries carry an optional
//! time-to-live; an expired entry is invisible to reads immediately and is
//! physically removed by [`KeyValueStore::purge_expired`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace `key`. `ttl = None` keeps the entry until deleted.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StorageResult<()>;

    /// Insert only when no live entry exists. Returns `false` when the key is taken.
    async fn insert_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StorageResult<bool>;

    /// Owned copy of the value, or `None` when missing or expired.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every expired entry, returning how many were dropped.
    async fn purge_expired(&self) -> StorageResult<usize>;

    fn backend_type(&self) -> StorageBackend;
}
