//! Upload validation
//!
//! `FileValidator` is a pure check of a candidate file's declared MIME type
//! and size against the configured allow-list and ceiling.

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File type '{mime_type}' is not supported")]
    InvalidType { mime_type: String },

    #[error("File size {size_bytes} bytes exceeds the maximum of {max_bytes} bytes")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("File is empty")]
    Empty,
}

/// Strip MIME parameters (`text/plain; charset=utf-8` -> `text/plain`).
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_content_types: Vec<String>,
}

impl FileValidator {
    pub fn new(max_file_size: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| normalize_mime_type(&ct))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_file_size_bytes() as u64,
            config.allowed_content_types().to_vec(),
        )
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Checked in order: type, size, emptiness.
    pub fn validate(&self, mime_type: &str, size_bytes: u64) -> Result<(), ValidationError> {
        let normalized = normalize_mime_type(mime_type);
        if !self.allowed_content_types.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::InvalidType {
                mime_type: normalized,
            });
        }

        if size_bytes > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size_bytes,
                max_bytes: self.max_file_size,
            });
        }

        if size_bytes == 0 {
            return Err(ValidationError::Empty);
        }

        Ok(())
    }
}
