//! Scripted provider for tests
//!
//! Every remote job replays the same status script, one step per
//! `get_job` call, and stays on the last step once it is reached. Failures
//! can be injected per source filename.
//!
//! The import task finishes once the bytes arrive (upload mode) or right
//! away (URL mode). With [`ScriptedProvider::with_pending_import`] it stays
//! waiting until the script leaves `Waiting`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Map;
use tokio::sync::Mutex;

use crate::error::ProviderError;
use crate::provider::{
    ConversionProvider, ImportSource, RemoteFile, RemoteJob, RemoteJobSpec, RemoteStatus,
    RemoteTask, UploadForm,
};

const UPLOAD_HOST: &str = "https://upload.scripted.test";
const EXPORT_HOST: &str = "https://storage.scripted.test";

struct ScriptedJob {
    spec: RemoteJobSpec,
    step: usize,
    input_received: bool,
}

pub struct ScriptedProvider {
    script: Vec<RemoteStatus>,
    failure_message: String,
    download_body: Vec<u8>,
    pending_import: bool,
    fail_create_for: HashSet<String>,
    fail_upload_for: HashSet<String>,
    fail_status_for: HashSet<String>,
    jobs: Mutex<HashMap<String, ScriptedJob>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    create_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    get_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new(vec![
            RemoteStatus::Waiting,
            RemoteStatus::Processing,
            RemoteStatus::Finished,
        ])
    }
}

impl ScriptedProvider {
    pub fn new(script: Vec<RemoteStatus>) -> Self {
        Self {
            script,
            failure_message: "Scripted conversion failure".to_string(),
            download_body: b"recognized text".to_vec(),
            pending_import: false,
            fail_create_for: HashSet::new(),
            fail_upload_for: HashSet::new(),
            fail_status_for: HashSet::new(),
            jobs: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn with_download_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.download_body = body.into();
        self
    }

    /// Import tasks stay waiting until the script moves past `Waiting`.
    pub fn with_pending_import(mut self) -> Self {
        self.pending_import = true;
        self
    }

    /// `create_job` fails for this source filename.
    pub fn fail_create_for(mut self, filename: impl Into<String>) -> Self {
        self.fail_create_for.insert(filename.into());
        self
    }

    /// `upload` fails for this source filename.
    pub fn fail_upload_for(mut self, filename: impl Into<String>) -> Self {
        self.fail_upload_for.insert(filename.into());
        self
    }

    /// `get_job` fails with a transport error for jobs of this source filename.
    pub fn fail_status_for(mut self, filename: impl Into<String>) -> Self {
        self.fail_status_for.insert(filename.into());
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Specs received so far, in creation order of their ids.
    pub async fn specs(&self) -> Vec<RemoteJobSpec> {
        let jobs = self.jobs.lock().await;
        let mut ids: Vec<&String> = jobs.keys().collect();
        ids.sort_by_key(|id| id.trim_start_matches("remote-").parse::<usize>().unwrap_or(0));
        ids.into_iter().map(|id| jobs[id].spec.clone()).collect()
    }

    /// `(filename, bytes)` of every successful upload.
    pub async fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().await.clone()
    }

    fn render(&self, id: &str, job: &ScriptedJob, status: RemoteStatus) -> RemoteJob {
        let spec = &job.spec;
        let import_operation = match spec.import {
            ImportSource::Upload => "import/upload",
            ImportSource::Url(_) => "import/url",
        };
        let import_status = if status == RemoteStatus::Waiting && !job.input_received {
            RemoteStatus::Waiting
        } else {
            RemoteStatus::Finished
        };
        let upload_form = matches!(spec.import, ImportSource::Upload).then(|| UploadForm {
            url: format!("{}/{}", UPLOAD_HOST, id),
            parameters: Map::new(),
        });

        let mut convert = RemoteTask {
            name: "convert-file".to_string(),
            operation: spec.operation.remote_operation().to_string(),
            status,
            message: None,
            upload_form: None,
            files: Vec::new(),
        };
        if status == RemoteStatus::Error {
            convert.message = Some(self.failure_message.clone());
        }

        let export_status = match status {
            RemoteStatus::Finished => RemoteStatus::Finished,
            RemoteStatus::Error => RemoteStatus::Error,
            _ => RemoteStatus::Waiting,
        };
        let files = if export_status == RemoteStatus::Finished {
            vec![RemoteFile {
                filename: spec.output_filename.clone(),
                url: format!("{}/{}/{}", EXPORT_HOST, id, spec.output_filename),
            }]
        } else {
            Vec::new()
        };

        RemoteJob {
            id: id.to_string(),
            status,
            tasks: vec![
                RemoteTask {
                    name: "import-file".to_string(),
                    operation: import_operation.to_string(),
                    status: import_status,
                    message: None,
                    upload_form,
                    files: Vec::new(),
                },
                convert,
                RemoteTask {
                    name: "export-file".to_string(),
                    operation: "export/url".to_string(),
                    status: export_status,
                    message: None,
                    upload_form: None,
                    files,
                },
            ],
        }
    }
}

#[async_trait]
impl ConversionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn create_job(&self, spec: &RemoteJobSpec) -> Result<RemoteJob, ProviderError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_create_for.contains(&spec.source_filename) {
            return Err(ProviderError::Api {
                status: 422,
                body: format!("Cannot create job for {}", spec.source_filename),
            });
        }

        let id = format!("remote-{}", n);
        let job = ScriptedJob {
            spec: spec.clone(),
            step: 0,
            input_received: matches!(spec.import, ImportSource::Url(_)) && !self.pending_import,
        };
        let rendered = self.render(&id, &job, RemoteStatus::Waiting);
        self.jobs.lock().await.insert(id, job);
        Ok(rendered)
    }

    async fn upload(
        &self,
        form: &UploadForm,
        filename: &str,
        _mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ProviderError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload_for.contains(filename) {
            return Err(ProviderError::Transport(format!(
                "Upload to {} failed",
                form.url
            )));
        }
        self.uploads
            .lock()
            .await
            .push((filename.to_string(), bytes));

        if !self.pending_import {
            let id = form.url.rsplit('/').next().unwrap_or_default();
            if let Some(job) = self.jobs.lock().await.get_mut(id) {
                job.input_received = true;
            }
        }
        Ok(())
    }

    async fn get_job(&self, remote_job_id: &str) -> Result<RemoteJob, ProviderError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(remote_job_id).ok_or_else(|| ProviderError::Api {
            status: 404,
            body: format!("Job {} not found", remote_job_id),
        })?;

        if self.fail_status_for.contains(&job.spec.source_filename) {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }

        let status = self
            .script
            .get(job.step)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(RemoteStatus::Processing);
        job.step += 1;

        Ok(self.render(remote_job_id, job, status))
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.download_body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convertly_core::ConversionOperation;

    fn spec(name: &str) -> RemoteJobSpec {
        RemoteJobSpec {
            import: ImportSource::Upload,
            source_filename: name.to_string(),
            output_filename: "out.pdf".to_string(),
            output_format: "pdf".to_string(),
            operation: ConversionOperation::Convert,
            options: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_replays_script_then_sticks() {
        let provider = ScriptedProvider::default();
        let job = provider.create_job(&spec("a.txt")).await.unwrap();
        assert!(job.upload_form().is_some());

        let statuses: Vec<RemoteStatus> = {
            let mut out = Vec::new();
            for _ in 0..4 {
                out.push(provider.get_job(&job.id).await.unwrap().status);
            }
            out
        };
        assert_eq!(
            statuses,
            vec![
                RemoteStatus::Waiting,
                RemoteStatus::Processing,
                RemoteStatus::Finished,
                RemoteStatus::Finished
            ]
        );

        let finished = provider.get_job(&job.id).await.unwrap();
        assert_eq!(finished.first_export_file().unwrap().filename, "out.pdf");
    }

    #[tokio::test]
    async fn test_import_finishes_after_upload() {
        let provider = ScriptedProvider::default();
        let job = provider.create_job(&spec("a.txt")).await.unwrap();
        assert!(!job.has_received_input());

        let form = job.upload_form().unwrap().clone();
        provider
            .upload(&form, "a.txt", "text/plain", b"hello".to_vec())
            .await
            .unwrap();
        let ack = provider.get_job(&job.id).await.unwrap();
        assert_eq!(ack.status, RemoteStatus::Waiting);
        assert!(ack.has_received_input());
    }

    #[tokio::test]
    async fn test_pending_import_waits_for_script() {
        let provider = ScriptedProvider::default().with_pending_import();
        let job = provider.create_job(&spec("a.txt")).await.unwrap();
        let form = job.upload_form().unwrap().clone();
        provider
            .upload(&form, "a.txt", "text/plain", b"hello".to_vec())
            .await
            .unwrap();

        assert!(!provider.get_job(&job.id).await.unwrap().has_received_input());
        assert!(provider.get_job(&job.id).await.unwrap().has_received_input());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let provider = ScriptedProvider::default()
            .fail_create_for("bad.txt")
            .fail_upload_for("flaky.txt");

        assert!(provider.create_job(&spec("bad.txt")).await.is_err());

        let job = provider.create_job(&spec("flaky.txt")).await.unwrap();
        let form = job.upload_form().unwrap().clone();
        assert!(provider
            .upload(&form, "flaky.txt", "text/plain", vec![1])
            .await
            .is_err());
        assert_eq!(provider.create_calls(), 2);
        assert_eq!(provider.upload_calls(), 1);
        assert!(provider.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn test_error_script_reports_message() {
        let provider = ScriptedProvider::new(vec![RemoteStatus::Error])
            .with_failure_message("Password protected PDF");
        let job = provider.create_job(&spec("a.pdf")).await.unwrap();
        let job = provider.get_job(&job.id).await.unwrap();
        assert_eq!(
            job.failure_message().as_deref(),
            Some("Password protected PDF")
        );
    }
}
