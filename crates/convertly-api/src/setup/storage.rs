//! Key-value store setup

use anyhow::Result;
use convertly_core::Config;
use convertly_storage::{create_store, KeyValueStore};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    tracing::info!("Initializing key-value store...");
    let store = create_store(config).await?;
    tracing::info!(
        backend = %store.backend_type(),
        upload_ttl_secs = config.upload_ttl().as_secs(),
        job_ttl_secs = config.job_ttl().as_secs(),
        "Key-value store initialized"
    );
    Ok(store)
}
