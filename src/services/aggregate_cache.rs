//! Read-through, time-boxed cache for aggregate statistics.
//!
//! `get_or_compute` returns the cached snapshot for a key while it is fresh
//! and otherwise runs the caller's producer and stores the result. A failed
//! producer never touches the store, so the previous entry survives until
//! its own expiry.
//!
//! Concurrent recomputation of the same key is collapsed into one in-flight
//! producer call (single-flight) unless disabled with
//! [`AggregateCache::with_single_flight`]. Followers holding an expired entry
//! get that stale value immediately; followers with nothing cached wait for
//! the leader. Coordination is per key and released as soon as the leader
//! finishes, fails or is cancelled.

use crate::clock::Clock;
use crate::error::{BoxError, CacheError};
use crate::models::{CacheEntry, Snapshot};
use crate::store::Store;
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

type InflightSender = Arc<watch::Sender<Option<Snapshot>>>;
type InflightMap = Arc<DashMap<String, InflightSender>>;

/// Clears the in-flight slot if the leader exits without publishing.
struct InflightLeaderGuard {
    inflight: InflightMap,
    key: String,
}

impl InflightLeaderGuard {
    fn publish(&self, snapshot: Snapshot) {
        if let Some((_, tx)) = self.inflight.remove(&self.key) {
            let _ = tx.send(Some(snapshot));
        }
    }
}

impl Drop for InflightLeaderGuard {
    fn drop(&mut self) {
        if let Some((_, tx)) = self.inflight.remove(&self.key) {
            let _ = tx.send(None);
        }
    }
}

enum Lookup {
    Fresh(Snapshot),
    Stale(Snapshot),
    Missing,
}

enum Role {
    Leader,
    Follower(watch::Receiver<Option<Snapshot>>),
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    stale_served: AtomicU64,
    producer_failures: AtomicU64,
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a fresh stored entry.
    pub hits: u64,
    /// Producer invocations.
    pub misses: u64,
    /// Calls answered with a result another caller produced.
    pub coalesced: u64,
    /// Calls answered with an expired entry while a recompute was in flight.
    pub stale_served: u64,
    pub producer_failures: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let served = self.hits + self.coalesced + self.stale_served;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

pub struct AggregateCache {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    single_flight: bool,
    inflight: InflightMap,
    counters: Counters,
}

impl AggregateCache {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            single_flight: true,
            inflight: Arc::new(DashMap::new()),
            counters: Counters::default(),
        }
    }

    /// With `false`, callers racing past an expired entry each run their own
    /// producer and each write; the last write wins.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            stale_served: self.counters.stale_served.load(Ordering::Relaxed),
            producer_failures: self.counters.producer_failures.load(Ordering::Relaxed),
        }
    }

    /// Returns the snapshot for `key`, computing it with `producer` when the
    /// stored entry is absent or older than `ttl_seconds`.
    ///
    /// `ttl_seconds == 0` always recomputes and skips coalescing.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl_seconds: u64,
        producer: F,
    ) -> Result<Snapshot, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot, E>>,
        E: Into<BoxError>,
    {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        if !self.single_flight || ttl_seconds == 0 {
            if let Lookup::Fresh(snapshot) = self.lookup(key, ttl_seconds).await? {
                return Ok(self.hit(key, snapshot));
            }
            return self.recompute(key, ttl_seconds, producer).await;
        }

        loop {
            let stale = match self.lookup(key, ttl_seconds).await? {
                Lookup::Fresh(snapshot) => return Ok(self.hit(key, snapshot)),
                Lookup::Stale(snapshot) => Some(snapshot),
                Lookup::Missing => None,
            };

            match self.register_or_join(key) {
                Role::Leader => {
                    let guard = InflightLeaderGuard {
                        inflight: Arc::clone(&self.inflight),
                        key: key.to_string(),
                    };

                    // Another leader may have stored a result between our
                    // lookup and taking the slot.
                    if let Lookup::Fresh(snapshot) = self.lookup(key, ttl_seconds).await? {
                        guard.publish(snapshot.clone());
                        return Ok(self.hit(key, snapshot));
                    }

                    let result = self.recompute(key, ttl_seconds, producer).await;
                    if let Ok(snapshot) = &result {
                        guard.publish(snapshot.clone());
                    }
                    return result;
                }
                Role::Follower(rx) => {
                    if let Some(snapshot) = stale {
                        debug!(key, "Recompute in flight, serving stale snapshot");
                        self.counters.stale_served.fetch_add(1, Ordering::Relaxed);
                        return Ok(snapshot);
                    }

                    if let Some(snapshot) = wait_for_leader(rx).await {
                        debug!(key, "Joined in-flight recompute");
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        return Ok(snapshot);
                    }

                    debug!(key, "In-flight recompute produced nothing, retrying");
                }
            }
        }
    }

    async fn lookup(&self, key: &str, ttl_seconds: u64) -> Result<Lookup, CacheError> {
        let entry = self
            .store
            .get(key)
            .await
            .map_err(|source| CacheError::StoreUnavailable { source })?;

        Ok(match entry {
            Some(entry) if entry.is_fresh_for(self.clock.now(), ttl_seconds) => {
                Lookup::Fresh(entry.value)
            }
            Some(entry) => Lookup::Stale(entry.value),
            None => Lookup::Missing,
        })
    }

    fn hit(&self, key: &str, snapshot: Snapshot) -> Snapshot {
        debug!(key, "Cache hit");
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        snapshot
    }

    fn register_or_join(&self, key: &str) -> Role {
        match self.inflight.entry(key.to_string()) {
            dashmap::Entry::Occupied(e) => Role::Follower(e.get().subscribe()),
            dashmap::Entry::Vacant(e) => {
                let (tx, _rx) = watch::channel(None);
                e.insert(Arc::new(tx));
                Role::Leader
            }
        }
    }

    async fn recompute<F, Fut, E>(
        &self,
        key: &str,
        ttl_seconds: u64,
        producer: F,
    ) -> Result<Snapshot, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot, E>>,
        E: Into<BoxError>,
    {
        debug!(key, ttl_seconds, "Cache miss, running producer");
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let snapshot = match producer().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let source = e.into();
                self.counters
                    .producer_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %source, "Producer failed, cached entry left as is");
                return Err(CacheError::ProducerFailed { source });
            }
        };

        let entry = CacheEntry::new(key, snapshot.clone(), self.clock.now(), ttl_seconds);
        self.store
            .set(key, entry)
            .await
            .map_err(|source| CacheError::StoreUnavailable { source })?;

        Ok(snapshot)
    }
}

async fn wait_for_leader(mut rx: watch::Receiver<Option<Snapshot>>) -> Option<Snapshot> {
    if rx.changed().await.is_ok() {
        let published = rx.borrow().clone();
        if published.is_some() {
            return published;
        }
    }
    let last = rx.borrow().clone();
    last
}
