#[cfg(feature = "storage-local")]
use crate::LocalStore;
use crate::{KeyValueStore, MemoryStore, StorageBackend, StorageError, StorageResult};
use convertly_core::Config;
use std::sync::Arc;

/// Create a key-value store based on configuration
pub async fn create_store(config: &Config) -> StorageResult<Arc<dyn KeyValueStore>> {
    match config.storage_backend() {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertly_core::ConverterConfig;

    #[tokio::test]
    async fn test_creates_memory_store_by_default() {
        let config = Config(Box::new(ConverterConfig::default()));
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Memory);
    }

    #[tokio::test]
    async fn test_local_store_requires_path() {
        let config = Config(Box::new(ConverterConfig {
            storage_backend: StorageBackend::Local,
            ..Default::default()
        }));
        assert!(matches!(
            create_store(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_creates_local_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config(Box::new(ConverterConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Default::default()
        }));
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Local);
    }
}
