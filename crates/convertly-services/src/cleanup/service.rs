use std::sync::Arc;
use std::time::Duration;

use convertly_storage::{KeyValueStore, StorageResult};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

/// Periodically drops expired uploads and job records from the store.
#[derive(Clone)]
pub struct CleanupService {
    store: Arc<dyn KeyValueStore>,
    interval: Duration,
}

impl CleanupService {
    pub fn new(store: Arc<dyn KeyValueStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Start the background sweep. Stops when `shutdown` is cancelled.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(self.interval);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Cleanup task stopped");
                        break;
                    }
                    _ = cleanup_interval.tick() => {}
                }

                match self.run_once().await {
                    Ok(purged) => tracing::info!(purged, "Cleanup of expired entries completed"),
                    Err(e) => tracing::error!(error = %e, "Cleanup task failed"),
                }
            }
        })
    }

    /// One sweep; returns how many entries were removed.
    #[tracing::instrument(skip(self), fields(backend = %self.store.backend_type()))]
    pub async fn run_once(&self) -> StorageResult<usize> {
        self.store.purge_expired().await
    }
}
