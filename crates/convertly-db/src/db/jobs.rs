use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use convertly_core::models::{ConversionJob, JobPatch};
use convertly_core::AppError;
use convertly_storage::keys::job_key;
use convertly_storage::KeyValueStore;
use uuid::Uuid;

use super::{storage_error, KeyedLocks};

/// Job tracker: local job records keyed by job id.
///
/// Updates to one job are serialized; reads never wait on a lock.
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    locks: Arc<KeyedLocks<Uuid>>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Insert a new record. Fails with `DuplicateJob` if the id is taken.
    pub async fn create(&self, mut job: ConversionJob) -> Result<ConversionJob, AppError> {
        job.expires_at = Some(
            job.created_at
                + chrono::Duration::from_std(self.ttl)
                    .map_err(|e| AppError::Internal(format!("Job TTL out of range: {}", e)))?,
        );

        let inserted = self
            .store
            .insert_if_absent(&job_key(&job.job_id), encode(&job)?, Some(self.ttl))
            .await
            .map_err(storage_error)?;

        if !inserted {
            return Err(AppError::DuplicateJob(job.job_id));
        }

        tracing::debug!(job_id = %job.job_id, status = %job.status, "Job created");
        Ok(job)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<ConversionJob, AppError> {
        let raw = self
            .store
            .get(&job_key(&job_id))
            .await
            .map_err(storage_error)?
            .ok_or(AppError::JobNotFound(job_id))?;

        serde_json::from_slice(&raw)
            .map_err(|e| AppError::Storage(format!("Corrupt job record {}: {}", job_id, e)))
    }

    /// Apply `patch` and persist. Terminal jobs are returned unchanged.
    pub async fn update(&self, job_id: Uuid, patch: JobPatch) -> Result<ConversionJob, AppError> {
        let _guard = self.locks.lock(&job_id).await;

        let mut job = self.get(job_id).await?;
        let previous = job.status;
        if !job.apply(patch) {
            tracing::debug!(job_id = %job_id, status = %job.status, "Ignoring update to terminal job");
            return Ok(job);
        }

        self.store
            .put(&job_key(&job_id), encode(&job)?, Some(self.remaining_ttl(&job)))
            .await
            .map_err(storage_error)?;

        if previous != job.status {
            tracing::info!(
                job_id = %job_id,
                from = %previous,
                to = %job.status,
                "Job status changed"
            );
        }

        Ok(job)
    }

    pub async fn delete(&self, job_id: Uuid) -> Result<bool, AppError> {
        let _guard = self.locks.lock(&job_id).await;
        self.store
            .delete(&job_key(&job_id))
            .await
            .map_err(storage_error)
    }

    /// Keep the original expiry when rewriting a record.
    fn remaining_ttl(&self, job: &ConversionJob) -> Duration {
        job.expires_at
            .and_then(|at| (at - Utc::now()).to_std().ok())
            .unwrap_or(self.ttl)
    }
}

fn encode(job: &ConversionJob) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(job).map_err(|e| AppError::Internal(format!("Failed to encode job: {}", e)))
}
