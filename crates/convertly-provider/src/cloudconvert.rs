//! CloudConvert v2 client
//!
//! A conversion is one job holding three named tasks: `import-file`
//! (`import/upload` or `import/url`), `convert-file` (`convert` or
//! `optimize`) and `export-file` (`export/url`). CloudConvert never pushes
//! status, so callers poll [`ConversionProvider::get_job`].

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use convertly_core::{Config, ConversionOperation, ProviderCredential};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::provider::{
    ConversionProvider, ImportSource, RemoteFile, RemoteJob, RemoteJobSpec, RemoteStatus,
    RemoteTask, UploadForm,
};

const IMPORT_TASK: &str = "import-file";
const CONVERT_TASK: &str = "convert-file";
const EXPORT_TASK: &str = "export-file";
const JOB_TAG: &str = "convertly";

pub struct CloudConvertProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: ProviderCredential,
}

impl Debug for CloudConvertProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CloudConvertProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// CloudConvert API structures
#[derive(Debug, Deserialize)]
struct JobEnvelope {
    data: JobData,
}

#[derive(Debug, Deserialize)]
struct JobData {
    id: String,
    status: RemoteStatus,
    #[serde(default)]
    tasks: Vec<TaskData>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    #[serde(default)]
    name: Option<String>,
    operation: String,
    status: RemoteStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    form: Option<FormData>,
    #[serde(default)]
    files: Vec<FileData>,
}

#[derive(Debug, Deserialize)]
struct FormData {
    url: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FileData {
    filename: String,
    #[serde(default)]
    url: Option<String>,
}

impl From<JobData> for RemoteJob {
    fn from(data: JobData) -> Self {
        RemoteJob {
            id: data.id,
            status: data.status,
            tasks: data
                .tasks
                .into_iter()
                .map(|task| {
                    let (upload_form, files) = match task.result {
                        Some(result) => (
                            result.form.map(|form| UploadForm {
                                url: form.url,
                                parameters: form.parameters,
                            }),
                            result
                                .files
                                .into_iter()
                                .filter_map(|file| {
                                    file.url.map(|url| RemoteFile {
                                        filename: file.filename,
                                        url,
                                    })
                                })
                                .collect(),
                        ),
                        None => (None, Vec::new()),
                    };
                    RemoteTask {
                        name: task.name.unwrap_or_default(),
                        operation: task.operation,
                        status: task.status,
                        message: task.message,
                        upload_form,
                        files,
                    }
                })
                .collect(),
        }
    }
}

impl CloudConvertProvider {
    pub fn new(
        api_key: ProviderCredential,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::Config(format!(
                    "Failed to create HTTP client for CloudConvert: {}",
                    e
                ))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Self::new(
            config.provider_api_key().clone(),
            config.provider_base_url(),
            config.provider_timeout(),
        )
    }

    /// Request body for `POST /jobs`.
    fn job_payload(spec: &RemoteJobSpec) -> Value {
        let import = match &spec.import {
            ImportSource::Upload => json!({ "operation": "import/upload" }),
            ImportSource::Url(url) => json!({
                "operation": "import/url",
                "url": url,
                "filename": spec.source_filename,
            }),
        };

        // Pipeline fields are written last so options cannot replace them.
        let mut convert = spec.options.clone();
        convert.insert(
            "operation".to_string(),
            json!(spec.operation.remote_operation()),
        );
        convert.insert("input".to_string(), json!(IMPORT_TASK));
        match spec.operation {
            ConversionOperation::Optimize => {
                convert.insert("input_format".to_string(), json!(spec.output_format));
            }
            ConversionOperation::Convert | ConversionOperation::Ocr => {
                convert.insert("output_format".to_string(), json!(spec.output_format));
            }
        }
        convert.insert("filename".to_string(), json!(spec.output_filename));

        let mut tasks = Map::new();
        tasks.insert(IMPORT_TASK.to_string(), import);
        tasks.insert(CONVERT_TASK.to_string(), Value::Object(convert));
        tasks.insert(
            EXPORT_TASK.to_string(),
            json!({ "operation": "export/url", "input": CONVERT_TASK }),
        );

        json!({ "tasks": tasks, "tag": JOB_TAG })
    }

    async fn parse_job(response: reqwest::Response) -> Result<RemoteJob, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JobEnvelope = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse CloudConvert job: {}", e))
        })?;

        Ok(envelope.data.into())
    }
}

#[async_trait]
impl ConversionProvider for CloudConvertProvider {
    fn name(&self) -> &'static str {
        "cloudconvert"
    }

    async fn create_job(&self, spec: &RemoteJobSpec) -> Result<RemoteJob, ProviderError> {
        let url = format!("{}/jobs", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&Self::job_payload(spec))
            .send()
            .await?;

        let job = Self::parse_job(response).await?;

        tracing::info!(
            remote_job_id = %job.id,
            output_format = %spec.output_format,
            operation = spec.operation.remote_operation(),
            "CloudConvert job created"
        );

        Ok(job)
    }

    async fn upload(
        &self,
        form: &UploadForm,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ProviderError> {
        let size = bytes.len();
        let mut multipart = reqwest::multipart::Form::new();
        for (key, value) in &form.parameters {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            multipart = multipart.text(key.clone(), value);
        }

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| ProviderError::Config(format!("Invalid MIME type: {}", e)))?;
        multipart = multipart.part("file", part);

        let start = std::time::Instant::now();
        let response = self
            .http_client
            .post(&form.url)
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Uploaded source file to CloudConvert"
        );

        Ok(())
    }

    async fn get_job(&self, remote_job_id: &str) -> Result<RemoteJob, ProviderError> {
        let url = format!(
            "{}/jobs/{}",
            self.base_url,
            urlencoding::encode(remote_job_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.api_key.expose())
            .send()
            .await?;

        Self::parse_job(response).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: "Failed to download export file".to_string(),
            });
        }

        let data = response.bytes().await?;
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn spec(import: ImportSource, operation: ConversionOperation) -> RemoteJobSpec {
        RemoteJobSpec {
            import,
            source_filename: "report.txt".to_string(),
            output_filename: "report.pdf".to_string(),
            output_format: "pdf".to_string(),
            operation,
            options: Map::new(),
        }
    }

    fn provider(base_url: &str) -> CloudConvertProvider {
        CloudConvertProvider::new(
            ProviderCredential::new("test-key"),
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn job_body(status: &str, tasks: Value) -> String {
        json!({ "data": { "id": "job-123", "status": status, "tasks": tasks } }).to_string()
    }

    #[test]
    fn test_job_payload_upload_convert() {
        let payload = CloudConvertProvider::job_payload(&spec(
            ImportSource::Upload,
            ConversionOperation::Convert,
        ));
        assert_eq!(payload["tasks"]["import-file"]["operation"], "import/upload");
        assert_eq!(payload["tasks"]["convert-file"]["operation"], "convert");
        assert_eq!(payload["tasks"]["convert-file"]["input"], "import-file");
        assert_eq!(payload["tasks"]["convert-file"]["output_format"], "pdf");
        assert_eq!(payload["tasks"]["convert-file"]["filename"], "report.pdf");
        assert_eq!(payload["tasks"]["export-file"]["operation"], "export/url");
        assert_eq!(payload["tasks"]["export-file"]["input"], "convert-file");
    }

    #[test]
    fn test_job_payload_url_import_and_optimize() {
        let mut spec = spec(
            ImportSource::Url("https://convert.example.com/files/abc".to_string()),
            ConversionOperation::Optimize,
        );
        spec.options.insert("profile".to_string(), json!("print"));
        let payload = CloudConvertProvider::job_payload(&spec);

        assert_eq!(payload["tasks"]["import-file"]["operation"], "import/url");
        assert_eq!(
            payload["tasks"]["import-file"]["url"],
            "https://convert.example.com/files/abc"
        );
        assert_eq!(payload["tasks"]["convert-file"]["operation"], "optimize");
        assert_eq!(payload["tasks"]["convert-file"]["input_format"], "pdf");
        assert_eq!(payload["tasks"]["convert-file"]["profile"], "print");
        assert!(payload["tasks"]["convert-file"].get("output_format").is_none());
    }

    #[test]
    fn test_job_payload_options_cannot_replace_pipeline_fields() {
        let mut spec = spec(ImportSource::Upload, ConversionOperation::Convert);
        spec.options.insert("output_format".to_string(), json!("png"));
        spec.options.insert("input".to_string(), json!("nonexistent-task"));
        spec.options.insert("pages".to_string(), json!("1-3"));
        let payload = CloudConvertProvider::job_payload(&spec);

        let convert = &payload["tasks"]["convert-file"];
        assert_eq!(convert["output_format"], "pdf");
        assert_eq!(convert["input"], "import-file");
        assert_eq!(convert["filename"], "report.pdf");
        assert_eq!(convert["pages"], "1-3");
    }

    #[tokio::test]
    async fn test_create_job_parses_upload_form() {
        let mut server = mockito::Server::new_async().await;
        let upload_url = format!("{}/upload/job-123", server.url());
        let mock = server
            .mock("POST", "/jobs")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "tasks": { "convert-file": { "output_format": "pdf" } }
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(job_body(
                "waiting",
                json!([{
                    "name": "import-file",
                    "operation": "import/upload",
                    "status": "waiting",
                    "result": { "form": { "url": upload_url, "parameters": { "expires": 1700000000, "signature": "abc" } } }
                }]),
            ))
            .create_async()
            .await;

        let job = provider(&server.url())
            .create_job(&spec(ImportSource::Upload, ConversionOperation::Convert))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(job.id, "job-123");
        assert_eq!(job.status, RemoteStatus::Waiting);
        let form = job.upload_form().unwrap();
        assert_eq!(form.url, upload_url);
        assert_eq!(form.parameters["signature"], "abc");
    }

    #[tokio::test]
    async fn test_create_job_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jobs")
            .with_status(401)
            .with_body("{\"message\":\"Unauthenticated.\"}")
            .create_async()
            .await;

        let err = provider(&server.url())
            .create_job(&spec(ImportSource::Upload, ConversionOperation::Convert))
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unauthenticated"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_posts_form_parameters_and_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/job-123")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"signature\"".to_string()),
                Matcher::Regex("name=\"file\"; filename=\"report.txt\"".to_string()),
                Matcher::Regex("hello world".to_string()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let mut parameters = Map::new();
        parameters.insert("signature".to_string(), json!("abc"));
        let form = UploadForm {
            url: format!("{}/upload/job-123", server.url()),
            parameters,
        };

        provider(&server.url())
            .upload(&form, "report.txt", "text/plain", b"hello world".to_vec())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_job_finished_with_export_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/job-123")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(job_body(
                "finished",
                json!([
                    { "name": "import-file", "operation": "import/upload", "status": "finished" },
                    { "name": "convert-file", "operation": "convert", "status": "finished" },
                    {
                        "name": "export-file",
                        "operation": "export/url",
                        "status": "finished",
                        "result": { "files": [{ "filename": "report.pdf", "url": "https://storage.example.com/report.pdf" }] }
                    }
                ]),
            ))
            .create_async()
            .await;

        let job = provider(&server.url()).get_job("job-123").await.unwrap();
        assert_eq!(job.status, RemoteStatus::Finished);
        let file = job.first_export_file().unwrap();
        assert_eq!(file.filename, "report.pdf");
        assert_eq!(file.url, "https://storage.example.com/report.pdf");
    }

    #[tokio::test]
    async fn test_get_job_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/job-123")
            .with_status(200)
            .with_body(job_body(
                "error",
                json!([
                    { "name": "convert-file", "operation": "convert", "status": "error", "message": "Input file is corrupt" }
                ]),
            ))
            .create_async()
            .await;

        let job = provider(&server.url()).get_job("job-123").await.unwrap();
        assert_eq!(job.status, RemoteStatus::Error);
        assert_eq!(job.failure_message().as_deref(), Some("Input file is corrupt"));
    }

    #[tokio::test]
    async fn test_get_job_invalid_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/job-123")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = provider(&server.url()).get_job("job-123").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/exports/out.txt")
            .with_status(200)
            .with_body("recognized text")
            .create_async()
            .await;

        let bytes = provider(&server.url())
            .download(&format!("{}/exports/out.txt", server.url()))
            .await
            .unwrap();
        assert_eq!(bytes, b"recognized text");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let rendered = format!("{:?}", provider("https://api.cloudconvert.com/v2"));
        assert!(!rendered.contains("test-key"));
    }
}
