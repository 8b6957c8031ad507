use async_trait::async_trait;
use convertly_core::ConversionOperation;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Status reported by the provider for a job or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Waiting,
    Finished,
    Error,
    /// Unknown statuses are treated as in-flight.
    #[serde(other)]
    Processing,
}

/// Where the provider reads the source file from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSource {
    /// The caller posts the bytes to the returned upload form.
    Upload,
    /// The provider fetches the file from a public URL.
    Url(String),
}

/// One import -> convert -> export pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteJobSpec {
    pub import: ImportSource,
    pub source_filename: String,
    pub output_filename: String,
    pub output_format: String,
    pub operation: ConversionOperation,
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub url: String,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTask {
    pub name: String,
    pub operation: String,
    pub status: RemoteStatus,
    pub message: Option<String>,
    pub upload_form: Option<UploadForm>,
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteJob {
    pub id: String,
    pub status: RemoteStatus,
    pub tasks: Vec<RemoteTask>,
}

impl RemoteJob {
    pub fn upload_form(&self) -> Option<&UploadForm> {
        self.tasks
            .iter()
            .find(|task| task.operation == "import/upload")
            .and_then(|task| task.upload_form.as_ref())
    }

    /// First file of the first finished export task.
    pub fn first_export_file(&self) -> Option<&RemoteFile> {
        self.tasks
            .iter()
            .filter(|task| task.operation.starts_with("export/"))
            .filter(|task| task.status == RemoteStatus::Finished)
            .flat_map(|task| task.files.iter())
            .next()
    }

    /// Message of the first failed task, if any.
    pub fn failure_message(&self) -> Option<String> {
        self.tasks
            .iter()
            .find(|task| task.status == RemoteStatus::Error)
            .map(|task| {
                task.message
                    .clone()
                    .unwrap_or_else(|| format!("Task '{}' failed", task.name))
            })
    }

    /// Whether the provider holds the source bytes yet.
    pub fn has_received_input(&self) -> bool {
        self.tasks
            .iter()
            .filter(|task| task.operation.starts_with("import/"))
            .all(|task| task.status != RemoteStatus::Waiting)
    }
}

#[async_trait]
pub trait ConversionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register the remote pipeline.
    async fn create_job(&self, spec: &RemoteJobSpec) -> Result<RemoteJob, ProviderError>;

    /// Post the source bytes to the job's upload form.
    async fn upload(
        &self,
        form: &UploadForm,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ProviderError>;

    async fn get_job(&self, remote_job_id: &str) -> Result<RemoteJob, ProviderError>;

    /// Fetch an exported artifact.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
