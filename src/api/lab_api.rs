use super::StatsSource;
use crate::error::SourceError;
use crate::models::{Dashboard, Snapshot};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Reads dashboard aggregates from the lab system's reporting endpoint.
///
/// `GET {base_url}/{dashboard}` is expected to answer with a flat JSON
/// object of counts, e.g. `{"transactions_today": 12, "stock_in_today": 3}`.
pub struct LabApi {
    client: Client,
    base_url: String,
}

impl LabApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, dashboard: Dashboard) -> String {
        format!("{}/{}", self.base_url, dashboard.slug())
    }
}

#[async_trait]
impl StatsSource for LabApi {
    async fn fetch(&self, dashboard: Dashboard) -> Result<Snapshot, SourceError> {
        let url = self.url_for(dashboard);
        debug!("Sending request to {}", url);

        let http_err = |source: reqwest::Error| SourceError::Http {
            dashboard: dashboard.to_string(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;

        let json: serde_json::Value = response.json().await.map_err(http_err)?;

        let snapshot = Snapshot::from_json(json).ok_or_else(|| SourceError::Malformed {
            dashboard: dashboard.to_string(),
        })?;
        debug!("Parsed {} metrics for {}", snapshot.len(), dashboard);

        Ok(snapshot)
    }
}
