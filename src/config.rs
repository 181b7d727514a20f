use crate::services::DASHBOARD_TTL_SECS;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "labdash",
    version,
    about = "Cached statistics for the lab administration dashboards",
    long_about = "Serves role dashboard statistics through a read-through cache.\n\
                  \n\
                  Environment Variables:\n\
                    LABDASH_SOURCE_URL          # Reporting endpoint base URL\n\
                    LABDASH_CACHE_DIR           # Persist cache entries in this directory\n\
                    LABDASH_TTL                 # Snapshot lifetime in seconds\n\
                    LABDASH_PRODUCER_TIMEOUT    # Seconds before a stats fetch is abandoned\n\
                    LABDASH_NO_COALESCE         # Let concurrent misses each recompute\n\
                    RUST_LOG                    # Log filter, e.g. labdash_cache=debug"
)]
pub struct Settings {
    /// Base URL of the lab reporting endpoint
    #[arg(long, env = "LABDASH_SOURCE_URL", default_value = "http://127.0.0.1:8000/api/stats")]
    pub source_url: String,

    /// Store cache entries as files in this directory (in-memory if unset)
    #[arg(long, env = "LABDASH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Seconds a dashboard snapshot stays fresh (0 = always recompute)
    #[arg(long, env = "LABDASH_TTL", default_value_t = DASHBOARD_TTL_SECS)]
    pub ttl: u64,

    /// Seconds before a statistics fetch counts as failed
    #[arg(long, env = "LABDASH_PRODUCER_TIMEOUT", default_value_t = 10)]
    pub producer_timeout: u64,

    /// Disable collapsing of concurrent recomputations per key
    #[arg(long, env = "LABDASH_NO_COALESCE")]
    pub no_coalesce: bool,
}

impl Settings {
    pub fn producer_timeout(&self) -> Duration {
        Duration::from_secs(self.producer_timeout)
    }
}
