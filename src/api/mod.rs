//! Read access to the lab system's aggregate statistics.

pub mod lab_api;

pub use lab_api::LabApi;

use crate::error::SourceError;
use crate::models::{Dashboard, Snapshot};
use async_trait::async_trait;

/// Computes the statistics behind one dashboard. Read-only.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self, dashboard: Dashboard) -> Result<Snapshot, SourceError>;
}
