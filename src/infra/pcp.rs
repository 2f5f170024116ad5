//! Cached PCP specialty-code snapshot (spec.md §5, §6).
//!
//! Refreshed on process start and, if configured, on a fixed interval.
//! Readers always see a fully-formed snapshot from the last successful
//! refresh; a failed refresh just leaves the previous snapshot in place.

use crate::error::EstimateError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

#[async_trait]
pub trait PcpSpecialtySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<String>, EstimateError>;
}

pub struct PcpSpecialtyCache {
    source: Arc<dyn PcpSpecialtySource>,
    snapshot: RwLock<Arc<Vec<String>>>,
}

impl PcpSpecialtyCache {
    pub async fn load(source: Arc<dyn PcpSpecialtySource>) -> Result<Arc<Self>, EstimateError> {
        let initial = source.fetch().await?;
        Ok(Arc::new(Self {
            source,
            snapshot: RwLock::new(Arc::new(initial)),
        }))
    }

    pub async fn snapshot(&self) -> Arc<Vec<String>> {
        self.snapshot.read().await.clone()
    }

    async fn refresh(&self) {
        match self.source.fetch().await {
            Ok(codes) => *self.snapshot.write().await = Arc::new(codes),
            Err(err) => tracing::warn!(?err, "pcp specialty refresh failed, keeping last snapshot"),
        }
    }

    /// Runs forever, refreshing on `interval`. Spawn as a background task.
    pub async fn run_refresh_loop(self: Arc<Self>, interval: Duration) -> ! {
        loop {
            tokio::time::sleep(interval).await;
            self.refresh().await;
        }
    }
}
