//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use convertly_core::Config;
use std::sync::Arc;

/// Build state and router from configuration.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let store = storage::setup_storage(&config).await?;
    let provider = services::setup_provider(&config)?;
    let state = services::initialize_services(&config, store, provider)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
