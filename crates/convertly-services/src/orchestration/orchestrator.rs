use std::sync::Arc;

use convertly_core::models::{ConversionJob, JobPatch, JobStatus, UploadedFile};
use convertly_core::{
    derive_output_filename, poll_until_terminal, AppError, Config, ConversionPlan, ImportMode,
    PollError, PollPolicy,
};
use convertly_db::{JobRepository, KeyedLocks, UploadRepository};
use convertly_provider::{ConversionProvider, ImportSource, RemoteJob, RemoteJobSpec, RemoteStatus};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const OCR_MIME_TYPE: &str = "text/plain";

/// Settings for orchestration (import mode, artifact URLs, poll cadence).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub import_mode: ImportMode,
    pub public_base_url: String,
    pub poll_policy: PollPolicy,
    pub batch_poll_policy: PollPolicy,
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            import_mode: config.provider_import_mode(),
            public_base_url: config.public_base_url().to_string(),
            poll_policy: PollPolicy::new(config.poll_interval(), config.max_poll_attempts()),
            batch_poll_policy: PollPolicy::new(
                config.batch_poll_interval(),
                config.max_poll_attempts(),
            ),
        }
    }

    pub(crate) fn file_url(&self, file_id: &Uuid) -> String {
        format!(
            "{}/files/{}",
            self.public_base_url.trim_end_matches('/'),
            file_id
        )
    }
}

/// Drives a job through `uploading -> queued -> processing -> finished | error`
/// against the provider. The only writer of job records.
pub struct ConversionOrchestrator {
    pub(crate) uploads: UploadRepository,
    pub(crate) jobs: JobRepository,
    pub(crate) provider: Arc<dyn ConversionProvider>,
    pub(crate) config: OrchestratorConfig,
    poll_locks: KeyedLocks<Uuid>,
}

impl ConversionOrchestrator {
    pub fn new(
        uploads: UploadRepository,
        jobs: JobRepository,
        provider: Arc<dyn ConversionProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            uploads,
            jobs,
            provider,
            config,
            poll_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Register a job and start remote processing without waiting for it.
    ///
    /// Only a missing file or an invalid target fails the call; provider
    /// failures are recorded on the returned job as `error`.
    #[tracing::instrument(skip(self, options), fields(job_id = tracing::field::Empty))]
    pub async fn create_job(
        &self,
        file_id: Uuid,
        target_format: &str,
        options: Option<&Map<String, Value>>,
    ) -> Result<ConversionJob, AppError> {
        let file = self.uploads.get(file_id).await?;
        let plan = ConversionPlan::resolve(target_format, options)?;

        let job = self
            .jobs
            .create(ConversionJob::new(
                file.id,
                plan.output_format.clone(),
                plan.conversion_type.clone(),
                plan.operation,
                derive_output_filename(&file.name, &plan.output_format),
            ))
            .await?;
        tracing::Span::current().record("job_id", tracing::field::display(job.job_id));

        let spec = RemoteJobSpec {
            import: match self.config.import_mode {
                ImportMode::Upload => ImportSource::Upload,
                ImportMode::Url => ImportSource::Url(self.config.file_url(&file.id)),
            },
            source_filename: file.name.clone(),
            output_filename: job.result_filename.clone(),
            output_format: plan.output_format,
            operation: plan.operation,
            options: plan.options,
        };

        let patch = self.submit(&spec, file).await;
        if let Some(message) = &patch.error_message {
            tracing::warn!(job_id = %job.job_id, error = %message, "Conversion job failed to start");
        }

        self.jobs.update(job.job_id, patch).await
    }

    /// Remote create, upload and acknowledgement. Always yields a patch.
    async fn submit(&self, spec: &RemoteJobSpec, file: UploadedFile) -> JobPatch {
        let remote = match self.provider.create_job(spec).await {
            Ok(remote) => remote,
            Err(e) => return JobPatch::failed(format!("Failed to create conversion job: {}", e)),
        };

        if spec.import == ImportSource::Upload {
            let Some(form) = remote.upload_form() else {
                return JobPatch::failed("Conversion provider returned no upload form")
                    .with_remote_job_id(&remote.id);
            };

            if let Err(e) = self
                .provider
                .upload(form, &file.name, &file.mime_type, file.bytes)
                .await
            {
                return JobPatch::failed(format!("Failed to upload file: {}", e))
                    .with_remote_job_id(&remote.id);
            }
        }

        match self.provider.get_job(&remote.id).await {
            Ok(ack) if ack.status == RemoteStatus::Error => JobPatch::failed(
                ack.failure_message()
                    .unwrap_or_else(|| "Conversion failed".to_string()),
            )
            .with_remote_job_id(&remote.id),
            Ok(ack) if !ack.has_received_input() => {
                // Stays uploading; a later poll advances it.
                tracing::debug!(remote_job_id = %remote.id, "Provider has not received input yet");
                JobPatch::default().with_remote_job_id(&remote.id)
            }
            Ok(_) => JobPatch::status(JobStatus::Queued).with_remote_job_id(&remote.id),
            Err(e) => JobPatch::failed(format!("Failed to confirm upload: {}", e))
                .with_remote_job_id(&remote.id),
        }
    }

    /// Stored job without contacting the provider.
    pub async fn get_job(&self, job_id: Uuid) -> Result<ConversionJob, AppError> {
        self.jobs.get(job_id).await
    }

    /// Refresh a job from the provider. Terminal jobs are returned as stored;
    /// concurrent polls of one job are serialized.
    #[tracing::instrument(skip(self))]
    pub async fn poll_status(&self, job_id: Uuid) -> Result<ConversionJob, AppError> {
        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let _guard = self.poll_locks.lock(&job_id).await;

        // Another poll may have finished the job while we waited.
        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        let Some(remote_job_id) = job.remote_job_id.clone() else {
            // Still being submitted.
            return Ok(job);
        };

        let patch = match self.provider.get_job(&remote_job_id).await {
            Ok(remote) => self.map_remote(&job, &remote).await,
            Err(e) => JobPatch::failed(format!("Failed to query conversion status: {}", e)),
        };

        self.jobs.update(job_id, patch).await
    }

    async fn map_remote(&self, job: &ConversionJob, remote: &RemoteJob) -> JobPatch {
        match remote.status {
            RemoteStatus::Waiting | RemoteStatus::Processing
                if job.status == JobStatus::Uploading && !remote.has_received_input() =>
            {
                JobPatch::default()
            }
            RemoteStatus::Waiting | RemoteStatus::Processing => {
                JobPatch::status(JobStatus::Processing)
            }
            RemoteStatus::Finished if job.operation.is_ocr() => self.finish_ocr(job, remote).await,
            RemoteStatus::Finished => match remote.first_export_file() {
                Some(file) => JobPatch::finished(&file.url),
                None => JobPatch::status(JobStatus::Finished),
            },
            RemoteStatus::Error => JobPatch::failed(
                remote
                    .failure_message()
                    .unwrap_or_else(|| "Conversion failed".to_string()),
            ),
        }
    }

    /// Pull the recognized text and re-serve it as a new upload.
    async fn finish_ocr(&self, job: &ConversionJob, remote: &RemoteJob) -> JobPatch {
        let Some(export) = remote.first_export_file() else {
            return JobPatch::failed("Text recognition produced no output");
        };

        let text = match self.provider.download(&export.url).await {
            Ok(text) => text,
            Err(e) => return JobPatch::failed(format!("Failed to download recognized text: {}", e)),
        };

        match self
            .uploads
            .store(&job.result_filename, OCR_MIME_TYPE, text)
            .await
        {
            Ok(artifact) => {
                tracing::info!(
                    job_id = %job.job_id,
                    artifact_id = %artifact.id,
                    size_bytes = artifact.size_bytes,
                    "Stored recognized text"
                );
                JobPatch::finished(self.config.file_url(&artifact.id))
            }
            Err(e) => JobPatch::failed(format!("Failed to store recognized text: {}", e)),
        }
    }

    /// Poll until terminal, the attempt ceiling or cancellation.
    pub async fn wait_for_job(
        &self,
        job_id: Uuid,
        policy: PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<ConversionJob, PollError<AppError>> {
        poll_until_terminal(policy, cancel, |_| self.poll_status(job_id)).await
    }
}
