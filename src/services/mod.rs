pub mod aggregate_cache;
pub mod dashboard_service;

pub use aggregate_cache::{AggregateCache, CacheStats};
pub use dashboard_service::{DashboardService, DASHBOARD_TTL_SECS};
