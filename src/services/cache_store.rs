//! Bounded LRU store with per-entry TTL and lazy expiry.
//!
//! Recency is kept in an [`IndexMap`]: the front holds the least recently
//! touched key and the back the most recent. A hit moves the key to the
//! back; inserting a new key into a full store evicts the front.
//!
//! Expired entries are only removed when touched (`get`, `has`, `set`) or
//! by an explicit [`CacheStore::prune`]. No timer or thread is involved.
//!
//! The store is a plain data structure. Callers that share it across tasks
//! serialize access behind a single mutex (see `RequestCoalescer`).

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Monotonic counters, reset only by [`CacheStore::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    /// Lookups answered with a fresh value.
    pub hits: u64,
    /// Lookups that found nothing or an expired value.
    pub misses: u64,
    /// Entries dropped to stay within `max_size`.
    pub evictions: u64,
    /// Entries dropped because their TTL ran out.
    pub expired: u64,
}

impl CacheCounters {
    /// Hit rate as a percentage string with two decimals, e.g. `"66.67%"`.
    pub fn hit_rate(&self) -> String {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return "0.00%".to_string();
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.hits as f64 / lookups as f64 * 100.0;
        format!("{rate:.2}%")
    }
}

/// Diagnostic view of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub age_ms: u64,
    pub remaining_ttl_ms: u64,
    pub expired: bool,
}

/// Bounded key/value store with LRU eviction and lazy TTL expiry.
pub struct CacheStore<V> {
    entries: IndexMap<String, CacheEntry<V>>,
    max_size: usize,
    default_ttl: Duration,
    counters: CacheCounters,
}

impl<V: Clone> CacheStore<V> {
    /// Create a store holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: IndexMap::with_capacity(max_size),
            max_size,
            default_ttl,
            counters: CacheCounters::default(),
        }
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    ///
    /// An entry past its TTL is removed and counted as both expired and a
    /// miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let Some(index) = self.entries.get_index_of(key) else {
            self.counters.misses += 1;
            return None;
        };

        if self.entries[index].is_expired(now) {
            self.entries.shift_remove_index(index);
            self.counters.expired += 1;
            self.counters.misses += 1;
            return None;
        }

        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.counters.hits += 1;
        Some(self.entries[last].value.clone())
    }

    /// Insert or replace `key`. `ttl` falls back to the store default.
    ///
    /// Replacing an existing key refreshes its recency and never evicts.
    /// Inserting a new key into a full store evicts the least recently used
    /// entry first.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        // A zero TTL would violate expires_at > inserted_at.
        let ttl = ttl.max(Duration::from_millis(1));

        if self.entries.shift_remove(&key).is_none() && self.entries.len() >= self.max_size {
            self.entries.shift_remove_index(0);
            self.counters.evictions += 1;
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Whether a fresh entry exists. Does not promote or count.
    pub fn has(&mut self, key: &str) -> bool {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.shift_remove(key);
                self.counters.expired += 1;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Fresh value for `key` without promotion or hit/miss counting.
    pub fn peek(&mut self, key: &str) -> Option<V> {
        if self.has(key) {
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            None
        }
    }

    /// Remove `key`; returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet touched.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Capacity before the least recently used entry is evicted.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Diagnostic snapshot, least recently used first.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let now = Instant::now();
        self.entries
            .iter()
            .map(|(key, entry)| EntryInfo {
                key: key.clone(),
                age_ms: millis(now.saturating_duration_since(entry.inserted_at)),
                remaining_ttl_ms: millis(entry.expires_at.saturating_duration_since(now)),
                expired: entry.is_expired(now),
            })
            .collect()
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn prune(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.counters.expired += removed as u64;
        removed
    }

    /// Snapshot of the hit, miss, eviction and expiry counters.
    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Zero the counters without touching stored entries.
    pub fn reset_stats(&mut self) {
        self.counters = CacheCounters::default();
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn store(max_size: usize) -> CacheStore<&'static str> {
        CacheStore::new(max_size, TTL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_round_trip() {
        let mut cache = store(4);
        cache.set("k", "v", Some(Duration::from_secs(5)));
        assert_eq!(cache.get("k"), Some("v"));
        assert_eq!(cache.counters().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_eviction_respects_access() {
        let mut cache = store(3);
        cache.set("a", "1", None);
        cache.set("b", "2", None);
        cache.set("c", "3", None);

        assert_eq!(cache.get("a"), Some("1"));
        cache.set("d", "4", None);

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert!(cache.has("d"));
        assert_eq!(cache.size(), 3);
        assert_eq!(cache.counters().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_counts_expired_and_miss() {
        let mut cache = store(4);
        cache.set("k", "v", Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("k"), Some("v"));
        assert_eq!(cache.counters().hits, 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("k"), None);

        let counters = cache.counters();
        assert_eq!(counters.expired, 1);
        assert_eq!(counters.misses, 1);
        assert_eq!(counters.hits, 1);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_does_not_promote_or_count() {
        let mut cache = store(2);
        cache.set("a", "1", None);
        cache.set("b", "2", None);

        assert!(cache.has("a"));
        assert_eq!(cache.counters().hits, 0);
        assert_eq!(cache.counters().misses, 0);

        // "a" is still least recently used, so it is the one evicted.
        cache.set("c", "3", None);
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_reads_without_side_effects() {
        let mut cache = store(2);
        cache.set("a", "1", None);
        cache.set("b", "2", None);

        assert_eq!(cache.peek("a"), Some("1"));
        assert_eq!(cache.peek("zz"), None);
        assert_eq!(cache.counters().hits, 0);
        assert_eq!(cache.counters().misses, 0);
        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_expires_lazily() {
        let mut cache = store(2);
        cache.set("a", "1", Some(Duration::from_secs(1)));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.size(), 1);
        assert!(!cache.has("a"));
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.counters().expired, 1);
        assert_eq!(cache.counters().misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_refreshes_recency_without_eviction() {
        let mut cache = store(2);
        cache.set("a", "1", None);
        cache.set("b", "2", None);
        cache.set("a", "1b", None);

        assert_eq!(cache.counters().evictions, 0);
        assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);

        cache.set("c", "3", None);
        assert!(!cache.has("b"));
        assert_eq!(cache.get("a"), Some("1b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_replaces_ttl() {
        let mut cache = store(2);
        cache.set("a", "1", Some(Duration::from_secs(1)));
        cache.set("a", "2", Some(Duration::from_secs(100)));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get("a"), Some("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let mut cache = store(2);
        cache.set("a", "1", None);
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(cache.has("a"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.has("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_removes_only_expired() {
        let mut cache = store(4);
        cache.set("short1", "1", Some(Duration::from_secs(1)));
        cache.set("short2", "2", Some(Duration::from_secs(1)));
        cache.set("long", "3", Some(Duration::from_secs(100)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.prune(), 2);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.counters().expired, 2);
        assert_eq!(cache.prune(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_reports_remaining_ttl() {
        let mut cache = store(4);
        cache.set("a", "1", Some(Duration::from_secs(10)));
        tokio::time::advance(Duration::from_secs(4)).await;

        let entries = cache.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[0].age_ms, 4000);
        assert_eq!(entries[0].remaining_ttl_ms, 6000);
        assert!(!entries[0].expired);

        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(cache.entries()[0].expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_and_clear() {
        let mut cache = store(4);
        cache.set("a", "1", None);
        cache.set("b", "2", None);

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_rate_formatting() {
        let counters = CacheCounters {
            hits: 2,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(counters.hit_rate(), "66.67%");
        assert_eq!(CacheCounters::default().hit_rate(), "0.00%");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stats() {
        let mut cache = store(1);
        cache.set("a", "1", None);
        let _ = cache.get("a");
        let _ = cache.get("missing");
        cache.reset_stats();
        assert_eq!(cache.counters(), CacheCounters::default());
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_size_is_clamped() {
        let mut cache = store(0);
        assert_eq!(cache.max_size(), 1);
        cache.set("a", "1", None);
        cache.set("b", "2", None);
        assert_eq!(cache.keys(), vec!["b".to_string()]);
    }
}
