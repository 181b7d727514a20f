use chrono::{TimeZone, Utc};
use futures::future::join_all;
use labdash_cache::{
    AggregateCache, BoxError, CacheError, ManualClock, MemoryStore, Snapshot, Store,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn make_cache(single_flight: bool) -> (Arc<AggregateCache>, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 3, 7, 30, 0).unwrap(),
    ));
    let cache = AggregateCache::new(store.clone(), clock.clone()).with_single_flight(single_flight);
    (Arc::new(cache), store, clock)
}

fn total_items(n: i64) -> Snapshot {
    Snapshot::new().with_metric("total_items", n)
}

async fn seed(cache: &AggregateCache, key: &str, n: i64) {
    cache
        .get_or_compute(key, 300, move || async move { Ok::<_, BoxError>(total_items(n)) })
        .await
        .unwrap();
}

/// Spawns a call whose producer signals `started`, then blocks until `gate` opens.
fn spawn_gated(
    cache: &Arc<AggregateCache>,
    key: &'static str,
    started: &Arc<Notify>,
    gate: &Arc<Notify>,
    outcome: Result<i64, &'static str>,
) -> tokio::task::JoinHandle<Result<Snapshot, CacheError>> {
    let cache = Arc::clone(cache);
    let started = Arc::clone(started);
    let gate = Arc::clone(gate);
    tokio::spawn(async move {
        cache
            .get_or_compute(key, 300, move || async move {
                started.notify_one();
                gate.notified().await;
                outcome.map(total_items).map_err(BoxError::from)
            })
            .await
    })
}

#[tokio::test]
async fn test_concurrent_cold_misses_run_producer_once() {
    let (cache, _store, _clock) = make_cache(true);
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute("dash:sec", 300, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, BoxError>(total_items(12))
                    })
                    .await
            })
        })
        .collect();

    let results = join_all(tasks).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap(), total_items(12));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced + stats.hits, 9);
}

#[tokio::test]
async fn test_without_single_flight_every_racer_recomputes() {
    let (cache, store, _clock) = make_cache(false);
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute("dash:sec", 300, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, BoxError>(total_items(i))
                    })
                    .await
            })
        })
        .collect();

    for result in join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(store.get("dash:sec").await.unwrap().is_some());
}

#[tokio::test]
async fn test_follower_gets_stale_value_while_recompute_in_flight() {
    let (cache, _store, clock) = make_cache(true);
    seed(&cache, "dash:mgr", 1).await;
    clock.advance_secs(301);

    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let leader = spawn_gated(&cache, "dash:mgr", &started, &gate, Ok(2));
    started.notified().await;

    let follower_calls = AtomicUsize::new(0);
    let calls = &follower_calls;
    let stale = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get_or_compute("dash:mgr", 300, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(total_items(99))
        }),
    )
    .await
    .expect("follower must not block behind the recompute")
    .unwrap();

    assert_eq!(stale, total_items(1));
    assert_eq!(follower_calls.load(Ordering::SeqCst), 0);

    gate.notify_one();
    assert_eq!(leader.await.unwrap().unwrap(), total_items(2));
    assert_eq!(cache.stats().stale_served, 1);

    let fresh = cache
        .get_or_compute("dash:mgr", 300, || async { Ok::<_, BoxError>(total_items(4)) })
        .await
        .unwrap();
    assert_eq!(fresh, total_items(2));
}

#[tokio::test]
async fn test_follower_recovers_when_leader_fails() {
    let (cache, store, _clock) = make_cache(true);

    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let leader = spawn_gated(&cache, "dash:admin", &started, &gate, Err("db down"));
    started.notified().await;

    let follower_calls = Arc::new(AtomicUsize::new(0));
    let follower = {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&follower_calls);
        tokio::spawn(async move {
            cache
                .get_or_compute("dash:admin", 300, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(total_items(5))
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();

    let leader_result = leader.await.unwrap();
    assert!(matches!(leader_result, Err(CacheError::ProducerFailed { .. })));

    let follower_result = tokio::time::timeout(Duration::from_secs(1), follower)
        .await
        .expect("follower must not hang after leader failure")
        .unwrap();
    assert_eq!(follower_result.unwrap(), total_items(5));
    assert_eq!(follower_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.get("dash:admin").await.unwrap().unwrap().value,
        total_items(5)
    );
}

#[tokio::test]
async fn test_slow_key_does_not_block_other_keys() {
    let (cache, _store, _clock) = make_cache(true);

    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let slow = spawn_gated(&cache, "dash:mgr", &started, &gate, Ok(1));
    started.notified().await;

    let other = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get_or_compute("dash:sec", 300, || async { Ok::<_, BoxError>(total_items(8)) }),
    )
    .await
    .expect("unrelated key must not wait")
    .unwrap();
    assert_eq!(other, total_items(8));

    gate.notify_one();
    assert_eq!(slow.await.unwrap().unwrap(), total_items(1));
}

#[tokio::test]
async fn test_cancelled_leader_releases_key() {
    let (cache, _store, _clock) = make_cache(true);

    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let leader = spawn_gated(&cache, "dash:mgr", &started, &gate, Ok(1));
    started.notified().await;

    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    let value = tokio::time::timeout(
        Duration::from_secs(1),
        cache.get_or_compute("dash:mgr", 300, || async { Ok::<_, BoxError>(total_items(3)) }),
    )
    .await
    .expect("key must be free after the leader is dropped")
    .unwrap();
    assert_eq!(value, total_items(3));
}

#[tokio::test]
async fn test_zero_ttl_failure_keeps_fresh_entry() {
    let (cache, store, _clock) = make_cache(true);
    seed(&cache, "dash:mgr", 42).await;
    let before = store.get("dash:mgr").await.unwrap().unwrap();

    let result = cache
        .get_or_compute("dash:mgr", 0, || async { Err::<Snapshot, _>("boom") })
        .await;

    assert!(matches!(result, Err(CacheError::ProducerFailed { .. })));
    assert_eq!(store.get("dash:mgr").await.unwrap().unwrap(), before);
}
