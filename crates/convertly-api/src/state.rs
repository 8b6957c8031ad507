//! Application state and sub-state extractors.

use convertly_core::{Config, FileValidator};
use convertly_db::UploadRepository;
use convertly_services::ConversionOrchestrator;
use convertly_storage::KeyValueStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Upload store and the validator applied before anything is stored.
#[derive(Clone)]
pub struct UploadState {
    pub repository: UploadRepository,
    pub validator: FileValidator,
}

#[derive(Clone)]
pub struct ConversionState {
    pub orchestrator: Arc<ConversionOrchestrator>,
}

pub struct AppState {
    pub uploads: UploadState,
    pub conversions: ConversionState,
    pub store: Arc<dyn KeyValueStore>,
    pub config: Config,
    /// Cancelled on shutdown; stops the sweeper and in-request batch polls.
    pub shutdown: CancellationToken,
}

impl axum::extract::FromRef<Arc<AppState>> for UploadState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.uploads.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ConversionState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.conversions.clone()
    }
}
