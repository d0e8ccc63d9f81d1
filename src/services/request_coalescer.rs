//! At-most-one in-flight fetch per cache key.
//!
//! The coalescer owns the shared [`CacheStore`] behind a single async mutex
//! together with the map of pending fetches. Concurrent callers asking for
//! the same key either get the cached value or join the one outstanding
//! fetch; the fetch closure is never invoked twice for a key while a fetch
//! for it is pending.
//!
//! The coalescer never writes fetch results into the cache itself. Callers
//! that want a result cached do so from inside their fetch future (via
//! [`RequestCoalescer::insert`]) so that only validated values are stored
//! and failures are never cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::{ServiceError, ServiceResult};
use crate::services::cache_store::{CacheStore, EntryInfo};

type SharedFetch<V> = Shared<BoxFuture<'static, ServiceResult<V>>>;

struct PendingFetch<V> {
    id: u64,
    fetch: SharedFetch<V>,
}

/// Where a coalesced value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Fresh value already in the cache.
    Cache,
    /// This caller started the fetch.
    Fetched,
    /// This caller joined a fetch started by someone else.
    Joined,
}

/// A value handed back by [`RequestCoalescer::dedupe`] and where it came from.
#[derive(Debug, Clone)]
pub struct Coalesced<V> {
    /// The cached or freshly fetched value.
    pub value: V,
    /// How this caller obtained it.
    pub source: Source,
}

impl<V> Coalesced<V> {
    /// True when the value was a cache hit.
    pub fn is_cached(&self) -> bool {
        self.source == Source::Cache
    }
}

/// Cache counters plus sizing, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub size: usize,
    pub max_size: usize,
    pub pending: usize,
    pub hit_rate: String,
}

/// Cache store plus pending-fetch registry. Cloning shares both.
pub struct RequestCoalescer<V> {
    cache: Arc<Mutex<CacheStore<V>>>,
    pending: Arc<Mutex<HashMap<String, PendingFetch<V>>>>,
    next_id: Arc<AtomicU64>,
}

impl<V> Clone for RequestCoalescer<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            pending: Arc::clone(&self.pending),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(store: CacheStore<V>) -> Self {
        Self {
            cache: Arc::new(Mutex::new(store)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the cached value for `key`, join a pending fetch, or start one.
    ///
    /// The fetch runs on its own task so it completes even if every caller
    /// stops waiting. Its pending marker is removed before the result is
    /// handed to waiters, whether it succeeded or failed.
    pub async fn dedupe<F, Fut>(&self, key: &str, fetch: F) -> ServiceResult<Coalesced<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServiceResult<V>> + Send + 'static,
    {
        let (shared, source) = {
            let mut pending = self.pending.lock().await;

            if let Some(value) = self.cache.lock().await.get(key) {
                debug!(key, "cache hit");
                return Ok(Coalesced {
                    value,
                    source: Source::Cache,
                });
            }

            if let Some(existing) = pending.get(key) {
                debug!(key, "joining pending fetch");
                (existing.fetch.clone(), Source::Joined)
            } else {
                debug!(key, "cache miss, starting fetch");
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let shared = self.spawn_fetch(key.to_string(), id, fetch());
                pending.insert(
                    key.to_string(),
                    PendingFetch {
                        id,
                        fetch: shared.clone(),
                    },
                );
                (shared, Source::Fetched)
            }
        };

        shared.await.map(|value| Coalesced { value, source })
    }

    fn spawn_fetch<Fut>(&self, key: String, id: u64, fut: Fut) -> SharedFetch<V>
    where
        Fut: Future<Output = ServiceResult<V>> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let task = tokio::spawn(async move {
            let result = fut.await;
            let mut pending = pending.lock().await;
            // A clear() may have let a newer fetch register under this key.
            if pending.get(&key).is_some_and(|p| p.id == id) {
                pending.remove(&key);
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|err| {
                warn!(error = %err, "coalesced fetch task did not complete");
                Err(ServiceError::Upstream(format!("fetch task aborted: {err}")))
            })
        }
        .boxed()
        .shared()
    }

    /// Store a value under `key`. `ttl` falls back to the store default.
    pub async fn insert(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.cache.lock().await.set(key, value, ttl);
    }

    /// Fresh cached value for `key`, counted as a hit or miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.cache.lock().await.get(key)
    }

    /// Fresh cached value for `key`, leaving recency and counters untouched.
    pub async fn peek(&self, key: &str) -> Option<V> {
        self.cache.lock().await.peek(key)
    }

    /// True when `key` holds a fresh value.
    pub async fn contains(&self, key: &str) -> bool {
        self.cache.lock().await.has(key)
    }

    /// Remove the cached value for `key`; returns whether one was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.cache.lock().await.delete(key)
    }

    /// Drop every cached entry and forget pending fetches.
    ///
    /// Fetches already running still finish, but later callers no longer
    /// join them.
    pub async fn clear(&self) {
        let mut pending = self.pending.lock().await;
        pending.clear();
        self.cache.lock().await.clear();
    }

    /// Remove expired entries, returning how many were removed.
    pub async fn prune(&self) -> usize {
        self.cache.lock().await.prune()
    }

    /// Cached keys, least recently used first.
    pub async fn keys(&self) -> Vec<String> {
        self.cache.lock().await.keys()
    }

    /// Diagnostic snapshot of every cached entry.
    pub async fn entries(&self) -> Vec<EntryInfo> {
        self.cache.lock().await.entries()
    }

    /// Number of fetches currently in flight.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Zero the cache counters.
    pub async fn reset_stats(&self) {
        self.cache.lock().await.reset_stats();
    }

    /// Counters, sizing and in-flight fetches in one snapshot.
    pub async fn stats(&self) -> CacheStats {
        let pending = self.pending_count().await;
        let cache = self.cache.lock().await;
        let counters = cache.counters();
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expired: counters.expired,
            size: cache.size(),
            max_size: cache.max_size(),
            pending,
            hit_rate: counters.hit_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn coalescer() -> RequestCoalescer<String> {
        RequestCoalescer::new(CacheStore::new(16, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_cached_value_skips_fetch() {
        let coalescer = coalescer();
        coalescer.insert("k", "cached".to_string(), None).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result = coalescer
            .dedupe("k", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(result.value, "cached");
        assert!(result.is_cached());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = (0..10).map(|_| {
            let coalescer = coalescer.clone();
            let calls = Arc::clone(&calls);
            async move {
                coalescer
                    .dedupe("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("value".to_string())
                    })
                    .await
            }
        });

        let results = futures::future::join_all(futures).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 10);
        for result in &results {
            assert_eq!(result.as_ref().unwrap().value, "value");
        }
        let fetched = results
            .iter()
            .filter(|r| r.as_ref().unwrap().source == Source::Fetched)
            .count();
        assert_eq!(fetched, 1);
        assert_eq!(coalescer.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_and_is_not_cached() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = (0..5).map(|_| {
            let coalescer = coalescer.clone();
            let calls = Arc::clone(&calls);
            async move {
                coalescer
                    .dedupe("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err::<String, _>(ServiceError::Upstream("boom".into()))
                    })
                    .await
            }
        });

        let results = futures::future::join_all(futures).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap_err(), ServiceError::Upstream("boom".into()));
        }

        assert!(!coalescer.contains("k").await);
        assert_eq!(coalescer.pending_count().await, 0);

        // The next caller starts a new fetch.
        let retry = coalescer
            .dedupe("k", || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(retry.value, "recovered");
        assert_eq!(retry.source, Source::Fetched);
    }

    #[tokio::test]
    async fn test_dedupe_does_not_populate_cache() {
        let coalescer = coalescer();
        coalescer
            .dedupe("k", || async { Ok("v".to_string()) })
            .await
            .unwrap();
        assert!(!coalescer.contains("k").await);
    }

    #[tokio::test]
    async fn test_fetch_that_inserts_is_visible_before_pending_clears() {
        let coalescer = coalescer();
        let writer = coalescer.clone();
        coalescer
            .dedupe("k", move || async move {
                writer.insert("k", "v".to_string(), None).await;
                Ok("v".to_string())
            })
            .await
            .unwrap();

        let second = coalescer
            .dedupe("k", || async { Ok("other".to_string()) })
            .await
            .unwrap();
        assert!(second.is_cached());
        assert_eq!(second.value, "v");
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_independently() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let futures = ["a", "b", "c"].into_iter().map(|key| {
            let coalescer = coalescer.clone();
            let calls = Arc::clone(&calls);
            async move {
                coalescer
                    .dedupe(key, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(key.to_string())
                    })
                    .await
            }
        });
        futures::future::join_all(futures).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clear_drops_entries_and_pending() {
        let coalescer = coalescer();
        coalescer.insert("a", "1".to_string(), None).await;

        let slow = coalescer.clone();
        let handle = tokio::spawn(async move {
            slow.dedupe("slow", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("late".to_string())
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(coalescer.pending_count().await, 1);

        coalescer.clear().await;
        assert_eq!(coalescer.pending_count().await, 0);
        assert!(coalescer.keys().await.is_empty());

        // The first waiter still receives its result.
        assert_eq!(handle.await.unwrap().unwrap().value, "late");
    }

    #[tokio::test]
    async fn test_stats_reports_hit_rate() {
        let coalescer = coalescer();
        coalescer.insert("k", "v".to_string(), None).await;
        coalescer.get("k").await;
        coalescer.get("k").await;
        coalescer.get("missing").await;

        let stats = coalescer.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, "66.67%");
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 16);
    }
}
