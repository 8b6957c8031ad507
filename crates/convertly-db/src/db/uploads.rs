use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use convertly_core::models::UploadedFile;
use convertly_core::AppError;
use convertly_storage::keys::{upload_data_key, upload_meta_key};
use convertly_storage::KeyValueStore;
use uuid::Uuid;

use super::storage_error;

const MAX_ID_ATTEMPTS: usize = 3;

/// Upload store: file content and metadata keyed by a generated id.
#[derive(Clone)]
pub struct UploadRepository {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl UploadRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Persist a new upload under a fresh id.
    #[tracing::instrument(skip(self, bytes), fields(size_bytes = bytes.len()))]
    pub async fn store(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl)
                .map_err(|e| AppError::Internal(format!("Upload TTL out of range: {}", e)))?;

        let mut file = UploadedFile::new(name, mime_type, bytes).with_expiry(expires_at);

        // Claim the metadata key first so the id is unique.
        let mut claimed = false;
        for _ in 0..MAX_ID_ATTEMPTS {
            let metadata = serde_json::to_vec(&file)
                .map_err(|e| AppError::Internal(format!("Failed to encode upload: {}", e)))?;
            if self
                .store
                .insert_if_absent(&upload_meta_key(&file.id), metadata, Some(self.ttl))
                .await
                .map_err(storage_error)?
            {
                claimed = true;
                break;
            }
            file.id = Uuid::new_v4();
        }
        if !claimed {
            return Err(AppError::Internal(
                "Failed to allocate a unique upload id".to_string(),
            ));
        }

        if let Err(e) = self
            .store
            .put(&upload_data_key(&file.id), file.bytes.clone(), Some(self.ttl))
            .await
        {
            let _ = self.store.delete(&upload_meta_key(&file.id)).await;
            return Err(storage_error(e));
        }

        tracing::info!(
            file_id = %file.id,
            mime_type = %file.mime_type,
            size_bytes = file.size_bytes,
            "Upload stored"
        );

        Ok(file)
    }

    /// Fetch an upload with an owned copy of its bytes.
    pub async fn get(&self, file_id: Uuid) -> Result<UploadedFile, AppError> {
        let metadata = self
            .store
            .get(&upload_meta_key(&file_id))
            .await
            .map_err(storage_error)?
            .ok_or(AppError::FileNotFound(file_id))?;

        let bytes = self
            .store
            .get(&upload_data_key(&file_id))
            .await
            .map_err(storage_error)?
            .ok_or(AppError::FileNotFound(file_id))?;

        let mut file: UploadedFile = serde_json::from_slice(&metadata)
            .map_err(|e| AppError::Storage(format!("Corrupt upload metadata: {}", e)))?;
        file.bytes = bytes;

        Ok(file)
    }

    pub async fn exists(&self, file_id: Uuid) -> Result<bool, AppError> {
        self.store
            .exists(&upload_meta_key(&file_id))
            .await
            .map_err(storage_error)
    }

    /// Returns whether the upload existed.
    pub async fn delete(&self, file_id: Uuid) -> Result<bool, AppError> {
        let removed = self
            .store
            .delete(&upload_meta_key(&file_id))
            .await
            .map_err(storage_error)?;
        self.store
            .delete(&upload_data_key(&file_id))
            .await
            .map_err(storage_error)?;
        Ok(removed)
    }
}
