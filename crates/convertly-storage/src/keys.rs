//! Shared key generation for store backends.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

pub fn upload_data_key(file_id: &Uuid) -> String {
    format!("uploads/{}/data", file_id)
}

pub fn upload_meta_key(file_id: &Uuid) -> String {
    format!("uploads/{}/meta.json", file_id)
}

pub fn job_key(job_id: &Uuid) -> String {
    format!("jobs/{}.json", job_id)
}

/// Reject keys that could escape a backend's namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}
