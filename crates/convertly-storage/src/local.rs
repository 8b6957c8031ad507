use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::keys::validate_key;
use crate::traits::{KeyValueStore, StorageError, StorageResult};
use crate::StorageBackend;

const EXPIRY_SUFFIX: &str = ".expires";
const TEMP_MARKER: &str = ".tmp-";

/// Local filesystem store.
///
/// Each entry is a file under `base_path`; its expiry, when set, lives in a
/// sibling `<file>.expires` holding an RFC 3339 timestamp.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create the store, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a key to a path under `base_path`.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        if key.ends_with(EXPIRY_SUFFIX) || key.contains(TEMP_MARKER) {
            return Err(StorageError::InvalidKey(format!(
                "Storage key uses a reserved suffix: {}",
                key
            )));
        }

        let path = self.base_path.join(key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    fn expiry_path(path: &Path) -> PathBuf {
        let mut raw = path.as_os_str().to_owned();
        raw.push(EXPIRY_SUFFIX);
        PathBuf::from(raw)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_expiry(path: &Path) -> StorageResult<Option<DateTime<Utc>>> {
        match fs::read_to_string(Self::expiry_path(path)).await {
            Ok(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(|e| {
                    StorageError::ReadFailed(format!(
                        "Corrupt expiry for {}: {}",
                        path.display(),
                        e
                    ))
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_expired(path: &Path) -> StorageResult<bool> {
        Ok(Self::read_expiry(path)
            .await?
            .is_some_and(|at| at <= Utc::now()))
    }

    async fn write_expiry(path: &Path, ttl: Option<Duration>) -> StorageResult<()> {
        let expiry_path = Self::expiry_path(path);
        match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl).map_err(|e| {
                    StorageError::WriteFailed(format!("TTL out of range: {}", e))
                })?;
                fs::write(&expiry_path, (Utc::now() + ttl).to_rfc3339()).await?;
            }
            None => {
                remove_if_present(&expiry_path).await?;
            }
        }
        Ok(())
    }

    async fn write_file(path: &Path, data: &[u8], create_new: bool) -> StorageResult<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .create_new(create_new)
            .open(path)
            .await?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn remove_entry(path: &Path) -> StorageResult<bool> {
        let removed = remove_if_present(path).await?;
        remove_if_present(&Self::expiry_path(path)).await?;
        Ok(removed)
    }
}

async fn remove_if_present(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::DeleteFailed(format!(
            "Failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = value.len();
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Write aside and rename so readers never see a partial value.
        let mut temp = path.as_os_str().to_owned();
        temp.push(format!("{}{}", TEMP_MARKER, Uuid::new_v4()));
        let temp = PathBuf::from(temp);

        Self::write_file(&temp, &value, false).await?;
        Self::write_expiry(&path, ttl).await?;
        fs::rename(&temp, &path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to move {} into place: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store write successful"
        );

        Ok(())
    }

    async fn insert_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        self.ensure_parent_dir(&path).await?;

        if fs::try_exists(&path).await? && Self::is_expired(&path).await? {
            Self::remove_entry(&path).await?;
        }

        match Self::write_file(&path, &value, true).await {
            Ok(()) => {}
            Err(StorageError::IoError(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        Self::write_expiry(&path, ttl).await?;

        Ok(true)
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.key_to_path(key)?;

        if Self::is_expired(&path).await? {
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        let was_live = !Self::is_expired(&path).await?;
        let removed = Self::remove_entry(&path).await?;
        Ok(removed && was_live)
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let mut purged = 0;
        let mut dirs = vec![self.base_path.clone()];

        while let Some(dir) = dirs.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    dirs.push(path);
                    continue;
                }

                let Some(data_path) = path
                    .to_str()
                    .and_then(|p| p.strip_suffix(EXPIRY_SUFFIX))
                    .map(PathBuf::from)
                else {
                    continue;
                };

                match Self::is_expired(&data_path).await {
                    Ok(true) => {
                        Self::remove_entry(&data_path).await?;
                        purged += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Removing unreadable expiry");
                        Self::remove_entry(&data_path).await?;
                        purged += 1;
                    }
                }
            }
        }

        Ok(purged)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
