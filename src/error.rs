//! Error types for the dashboard cache.
//!
//! `CacheError` keeps "my computation failed" apart from "the cache substrate
//! failed" so callers can pick their own fallback.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause carried by a failed producer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Snapshot producer failed: {source}")]
    ProducerFailed {
        #[source]
        source: BoxError,
    },

    #[error("Cache store unavailable: {source}")]
    StoreUnavailable {
        #[source]
        source: StoreError,
    },

    #[error("Cache key must not be empty")]
    InvalidKey,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on cache entry '{key}' at {path}")]
    Io {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache entry '{key}'")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures reading statistics from the lab system.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request for {dashboard} statistics failed")]
    Http {
        dashboard: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Statistics for {dashboard} took longer than {timeout_secs}s")]
    Timeout { dashboard: String, timeout_secs: u64 },

    #[error("Statistics for {dashboard} were not a JSON object")]
    Malformed { dashboard: String },
}
