//! Domain methods for the Convertly API client.

use crate::{ensure_success, ApiClient};
use anyhow::{Context, Result};
use convertly_core::models::{
    BatchConvertRequest, BatchConvertResponse, ConvertRequest, ConvertResponse,
    JobStatusResponse, UploadResponse,
};
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

/// Content type sent for a local file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "rtf" => "application/rtf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Upload a local file.
    pub async fn upload_file(&self, file_path: &Path) -> Result<UploadResponse> {
        if file_path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", file_path.display()));
        }

        let bytes = tokio::fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");

        self.upload_bytes(filename, content_type_for(file_path), bytes)
            .await
    }

    pub async fn upload_bytes(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .context("Invalid content type")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart("/upload", form).await
    }

    /// Start a conversion; returns as soon as the job is registered.
    pub async fn create_conversion(
        &self,
        file_id: Uuid,
        target_format: &str,
        options: Option<Map<String, Value>>,
    ) -> Result<ConvertResponse> {
        let request = ConvertRequest {
            file_id,
            target_format: target_format.to_string(),
            options,
        };
        self.post_json("/convert", &request).await
    }

    /// One status check; the server refreshes the job from the provider.
    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusResponse> {
        self.get("/convert", &[("jobId", job_id.to_string())])
            .await
    }

    /// Sequential batch conversion; the call returns when every file is done.
    pub async fn convert_batch(
        &self,
        file_ids: Vec<Uuid>,
        target_format: &str,
        options: Option<Map<String, Value>>,
    ) -> Result<BatchConvertResponse> {
        let request = BatchConvertRequest {
            file_ids,
            target_format: target_format.to_string(),
            options,
        };
        self.post_json("/convert/batch", &request).await
    }

    /// Fetch a result artifact by absolute URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client()
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .context("Failed to read response body")?;
        Ok(bytes.to_vec())
    }
}
