//! Service initialization and application state setup

use crate::state::{AppState, ConversionState, UploadState};
use anyhow::{Context, Result};
use convertly_core::{Config, FileValidator};
use convertly_db::{JobRepository, UploadRepository};
use convertly_provider::{CloudConvertProvider, ConversionProvider};
use convertly_services::{CleanupService, ConversionOrchestrator, OrchestratorConfig};
use convertly_storage::KeyValueStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// CloudConvert client from configuration. The credential is never logged.
pub fn setup_provider(config: &Config) -> Result<Arc<dyn ConversionProvider>> {
    let provider = CloudConvertProvider::from_config(config)
        .context("Failed to create CloudConvert client")?;
    tracing::info!(
        base_url = %config.provider_base_url(),
        import_mode = ?config.provider_import_mode(),
        timeout_secs = config.provider_timeout().as_secs(),
        "Conversion provider configured"
    );
    Ok(Arc::new(provider))
}

/// Wire repositories, orchestrator and the TTL sweeper into the app state.
///
/// Must run inside a tokio runtime; the sweeper is spawned here and stops
/// when `AppState::shutdown` is cancelled.
pub fn initialize_services(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn ConversionProvider>,
) -> Result<Arc<AppState>> {
    let uploads = UploadRepository::new(store.clone(), config.upload_ttl());
    let jobs = JobRepository::new(store.clone(), config.job_ttl());

    let orchestrator = Arc::new(ConversionOrchestrator::new(
        uploads.clone(),
        jobs,
        provider.clone(),
        OrchestratorConfig::from_config(config),
    ));
    tracing::info!(provider = provider.name(), "Conversion orchestrator initialized");

    let shutdown = CancellationToken::new();

    Arc::new(CleanupService::new(store.clone(), config.cleanup_interval()))
        .start(shutdown.clone());
    tracing::info!(
        interval_secs = config.cleanup_interval().as_secs(),
        "Started expired-entry cleanup task"
    );

    Ok(Arc::new(AppState {
        uploads: UploadState {
            repository: uploads,
            validator: FileValidator::from_config(config),
        },
        conversions: ConversionState { orchestrator },
        store,
        config: config.clone(),
        shutdown,
    }))
}
