use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to reach conversion provider: {0}")]
    Transport(String),

    #[error("Conversion provider request failed: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected conversion provider response: {0}")]
    InvalidResponse(String),

    #[error("Remote job {0} has no upload form")]
    MissingUploadForm(String),

    #[error("Provider client configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<ProviderError> for convertly_core::AppError {
    fn from(err: ProviderError) -> Self {
        convertly_core::AppError::Provider(err.to_string())
    }
}
