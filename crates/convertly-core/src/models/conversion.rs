use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::formats::ConversionOperation;

/// Most files accepted by one batch request.
pub const MAX_BATCH_FILES: usize = 20;

const MISSING_RESULT_MESSAGE: &str = "Provider reported completion without a result file";
const DEFAULT_FAILURE_MESSAGE: &str = "Conversion failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploading,
    Queued,
    Processing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Uploading => write!(f, "uploading"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Finished => write!(f, "finished"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(JobStatus::Uploading),
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "finished" => Ok(JobStatus::Finished),
            "error" => Ok(JobStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Local record of one conversion, owned by the job tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_job_id: Option<String>,
    pub source_file: Uuid,
    pub target_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_type: Option<String>,
    pub operation: ConversionOperation,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    pub result_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(
        source_file: Uuid,
        target_format: impl Into<String>,
        conversion_type: Option<String>,
        operation: ConversionOperation,
        result_filename: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            remote_job_id: None,
            source_file,
            target_format: target_format.into(),
            conversion_type,
            operation,
            status: JobStatus::Uploading,
            result_url: None,
            result_filename: result_filename.into(),
            error_message: None,
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// Apply a partial update. Returns `false` when the job is already
    /// terminal, in which case nothing changes.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        if let Some(remote_job_id) = patch.remote_job_id {
            self.remote_job_id = Some(remote_job_id);
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = Some(expires_at);
        }

        match patch.status {
            Some(JobStatus::Finished) => match patch.result_url {
                Some(url) => {
                    self.status = JobStatus::Finished;
                    self.result_url = Some(url);
                    self.error_message = None;
                }
                None => {
                    self.status = JobStatus::Error;
                    self.result_url = None;
                    self.error_message = Some(MISSING_RESULT_MESSAGE.to_string());
                }
            },
            Some(JobStatus::Error) => {
                self.status = JobStatus::Error;
                self.result_url = None;
                self.error_message = Some(
                    patch
                        .error_message
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                );
            }
            Some(status) => {
                self.status = status;
                self.result_url = None;
                self.error_message = None;
            }
            None => {}
        }

        self.updated_at = Utc::now();
        true
    }
}

/// Partial update for a [`ConversionJob`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub remote_job_id: Option<String>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn finished(result_url: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Finished),
            result_url: Some(result_url.into()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_remote_job_id(mut self, remote_job_id: impl Into<String>) -> Self {
        self.remote_job_id = Some(remote_job_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub file_id: Uuid,
    /// Output format (`pdf`, `docx`) or conversion type (`pdf-to-word`).
    #[validate(length(min = 1, max = 64))]
    pub target_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub options: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: Uuid,
    pub data: ConversionJob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ConversionJob> for JobStatusResponse {
    fn from(job: &ConversionJob) -> Self {
        let finished = job.status == JobStatus::Finished;
        Self {
            status: job.status,
            result_url: job.result_url.clone(),
            filename: finished.then(|| job.result_filename.clone()),
            error: job.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchConvertRequest {
    #[validate(length(min = 1, max = 20))]
    pub file_ids: Vec<Uuid>,
    #[validate(length(min = 1, max = 64))]
    pub target_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub options: Option<Map<String, Value>>,
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum BatchItemResult {
    #[serde(rename_all = "camelCase")]
    Ok {
        file_id: Uuid,
        job_id: Uuid,
        filename: String,
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        file_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<Uuid>,
        reason: String,
    },
}

impl BatchItemResult {
    pub fn file_id(&self) -> Uuid {
        match self {
            BatchItemResult::Ok { file_id, .. } | BatchItemResult::Failed { file_id, .. } => {
                *file_id
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BatchItemResult::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchConvertResponse {
    pub results: Vec<BatchItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchConvertResponse {
    pub fn new(results: Vec<BatchItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}
