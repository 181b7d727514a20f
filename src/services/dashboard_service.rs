use crate::api::StatsSource;
use crate::error::{CacheError, SourceError};
use crate::models::{Dashboard, Snapshot};
use crate::services::aggregate_cache::{AggregateCache, CacheStats};
use crate::utils::display::DisplayFormatter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Seconds a dashboard snapshot stays valid.
pub const DASHBOARD_TTL_SECS: u64 = 300;

/// Serves dashboard statistics through the aggregate cache.
///
/// Owns the caller-side policy: per-dashboard keys, the TTL, a timeout on
/// the producer, and falling back to an uncached fetch when the store is down.
///
/// The fallback cannot tell a failed read from a failed write. When the
/// write fails, the snapshot already produced is dropped by the cache, so
/// that request fetches from the source twice.
pub struct DashboardService {
    cache: Arc<AggregateCache>,
    source: Arc<dyn StatsSource>,
    ttl_seconds: u64,
    producer_timeout: Duration,
    display: DisplayFormatter,
}

impl DashboardService {
    pub fn new(cache: Arc<AggregateCache>, source: Arc<dyn StatsSource>) -> Self {
        Self {
            cache,
            source,
            ttl_seconds: DASHBOARD_TTL_SECS,
            producer_timeout: Duration::from_secs(10),
            display: DisplayFormatter::new(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_producer_timeout(mut self, timeout: Duration) -> Self {
        self.producer_timeout = timeout;
        self
    }

    pub async fn snapshot(&self, dashboard: Dashboard) -> Result<Snapshot, CacheError> {
        let key = dashboard.cache_key();
        let result = self
            .cache
            .get_or_compute(key, self.ttl_seconds, move || self.fetch_with_timeout(dashboard))
            .await;

        match result {
            Err(CacheError::StoreUnavailable { source }) => {
                warn!(key, error = %source, "Cache store unavailable, computing uncached");
                self.fetch_with_timeout(dashboard)
                    .await
                    .map_err(|e| CacheError::ProducerFailed { source: e.into() })
            }
            other => other,
        }
    }

    pub async fn fetch_and_display(&self, dashboard: Dashboard) -> Result<(), CacheError> {
        info!("Loading {} dashboard", dashboard);
        let snapshot = self.snapshot(dashboard).await?;
        println!("{}", self.display.format_snapshot(dashboard, &snapshot));
        Ok(())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn fetch_with_timeout(&self, dashboard: Dashboard) -> Result<Snapshot, SourceError> {
        match tokio::time::timeout(self.producer_timeout, self.source.fetch(dashboard)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                dashboard: dashboard.to_string(),
                timeout_secs: self.producer_timeout.as_secs(),
            }),
        }
    }
}
