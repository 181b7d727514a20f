use super::snapshot::Snapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Snapshot,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Snapshot, stored_at: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at,
            ttl_seconds,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.stored_at, self.ttl_seconds)
    }

    /// Stale once `now >= stored_at + ttl_seconds`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Fresh under both the stored TTL and the one the reader asks for.
    pub fn is_fresh_for(&self, now: DateTime<Utc>, ttl_seconds: u64) -> bool {
        self.is_fresh(now) && now < expiry(self.stored_at, ttl_seconds)
    }
}

fn expiry(stored_at: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    stored_at
        .checked_add_signed(Duration::try_seconds(ttl).unwrap_or(Duration::MAX))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
