//
// discovery_cache.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

//! Memoizes expensive enumerations per logical scope.
//!
//! Each scope key owns one slot guarded by an async mutex. Concurrent
//! callers for the same key serialize on the slot: the first runs the
//! compute future, the rest wake up to find the filled slot and share the
//! same `Arc`. The compute future therefore runs at most once per filled
//! slot -- there are never N independent filesystem scans for one scope.
//!
//! There is no TTL; invalidation is explicit.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

type Slot<T> = Arc<AsyncMutex<Option<Arc<T>>>>;

/// A per-scope memo cache with request coalescing.
pub struct DiscoveryCache<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> DiscoveryCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it if absent.
    ///
    /// `compute` returning `None` means the computation was abandoned
    /// (typically cancelled); nothing is cached and the next caller
    /// recomputes.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        if let Some(value) = guard.as_ref() {
            return Some(value.clone());
        }
        let value = Arc::new(compute().await?);
        *guard = Some(value.clone());
        Some(value)
    }

    /// Drop the cached value for `key` so the next call recomputes.
    ///
    /// A computation already in flight for the key finishes against the old
    /// slot; its result is not observed by callers arriving after the
    /// invalidation.
    pub fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap();
        if slots.remove(key).is_some() {
            log::debug!("Invalidated discovery cache for scope '{}'", key);
        }
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }

    fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }
}

impl<T> Default for DiscoveryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
