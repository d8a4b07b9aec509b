//
// discovery_cache_tests.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//

//! Tests for the per-scope discovery cache and its request coalescing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eicore::DiscoveryCache;

#[tokio::test]
async fn test_concurrent_callers_share_one_computation() {
    let cache: Arc<DiscoveryCache<Vec<String>>> = Arc::new(DiscoveryCache::new());
    let computations = Arc::new(AtomicUsize::new(0));

    // Race a batch of callers for the same scope key; the compute closure
    // sleeps so all of them are in flight together
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let computations = computations.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute("workspaceA", || async {
                    computations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Some(vec!["python3".to_string()])
                })
                .await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("task panicked").expect("cache miss"));
    }

    assert_eq!(
        computations.load(Ordering::SeqCst),
        1,
        "The compute closure must run exactly once for concurrent callers"
    );

    // Every caller observes the identical result object
    let first = &results[0];
    for result in &results {
        assert!(Arc::ptr_eq(first, result));
    }
}

#[tokio::test]
async fn test_distinct_keys_compute_independently() {
    let cache: DiscoveryCache<u32> = DiscoveryCache::new();

    let a = cache.get_or_compute("a", || async { Some(1) }).await.unwrap();
    let b = cache.get_or_compute("b", || async { Some(2) }).await.unwrap();
    assert_eq!(*a, 1);
    assert_eq!(*b, 2);
}

#[tokio::test]
async fn test_invalidate_forces_recompute() {
    let cache: DiscoveryCache<u32> = DiscoveryCache::new();
    let computations = AtomicUsize::new(0);

    let compute = || async {
        computations.fetch_add(1, Ordering::SeqCst);
        Some(computations.load(Ordering::SeqCst) as u32)
    };

    let first = cache.get_or_compute("scope", compute).await.unwrap();
    let cached = cache.get_or_compute("scope", compute).await.unwrap();
    assert_eq!(*first, 1);
    assert_eq!(*cached, 1, "Second call must be served from the cache");

    cache.invalidate("scope");
    let recomputed = cache.get_or_compute("scope", compute).await.unwrap();
    assert_eq!(*recomputed, 2, "Invalidation must force a recompute");
    assert_eq!(computations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_abandoned_computation_caches_nothing() {
    let cache: DiscoveryCache<u32> = DiscoveryCache::new();

    // A compute that bails (e.g. cancelled) leaves the slot empty
    let abandoned = cache.get_or_compute("scope", || async { None }).await;
    assert!(abandoned.is_none());

    let value = cache.get_or_compute("scope", || async { Some(7) }).await.unwrap();
    assert_eq!(*value, 7, "The next caller must get a fresh computation");
}

#[tokio::test]
async fn test_clear_drops_all_scopes() {
    let cache: DiscoveryCache<u32> = DiscoveryCache::new();
    cache.get_or_compute("a", || async { Some(1) }).await.unwrap();
    cache.get_or_compute("b", || async { Some(2) }).await.unwrap();

    cache.clear();

    let a = cache.get_or_compute("a", || async { Some(10) }).await.unwrap();
    assert_eq!(*a, 10);
}
