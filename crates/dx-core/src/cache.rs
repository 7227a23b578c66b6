//! Time-bounded cache with stale-on-failure semantics.
//!
//! A [`TtlCache`] only remembers *successful* refreshes. It never decides when
//! to refresh; the owner checks [`TtlCache::lookup`], fetches when the entry is
//! stale or missing, and calls [`TtlCache::set`] only on success. A failed
//! refresh therefore leaves the previous payload and its `fetched_at` exactly
//! as they were, which is what makes stale-serving possible.
//!
//! Timestamps use [`tokio::time::Instant`] so tests can drive them with
//! `tokio::time::pause()` / `advance()`.

use std::hash::Hash;
use std::time::Duration;

use ahash::AHashMap;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// One cached value and the moment its fetch *completed*.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// Within the TTL; serve without touching upstream.
    Fresh(V),
    /// Past the TTL; refresh, but serve this if the refresh fails.
    Stale(V),
    /// Never successfully set.
    Missing,
}

impl<V> Lookup<V> {
    /// The payload regardless of freshness.
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Fresh(v) | Self::Stale(v) => Some(v),
            Self::Missing => None,
        }
    }
}

/// Generic keyed TTL cache; one instance per upstream source.
///
/// Reads take a shared lock, writes an exclusive one, so concurrent refreshes
/// cannot lose an update: the later-completed fetch always wins.
pub struct TtlCache<K, V> {
    name: String,
    ttl: Duration,
    entries: RwLock<AHashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self { name: name.into(), ttl, entries: RwLock::new(AHashMap::new()) }
    }

    /// Cached payload regardless of freshness.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.read().await.get(key).map(|e| e.payload.clone())
    }

    /// `true` iff a value was set at least once and is younger than the TTL.
    pub async fn is_fresh(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries.read().await.get(key).is_some_and(|e| e.is_fresh(self.ttl, now))
    }

    /// Completion time of the last successful refresh.
    pub async fn fetched_at(&self, key: &K) -> Option<Instant> {
        self.entries.read().await.get(key).map(|e| e.fetched_at)
    }

    /// Read the entry together with its freshness.
    pub async fn lookup(&self, key: &K) -> Lookup<V> {
        let now = Instant::now();
        match self.entries.read().await.get(key) {
            Some(e) if e.is_fresh(self.ttl, now) => Lookup::Fresh(e.payload.clone()),
            Some(e) => Lookup::Stale(e.payload.clone()),
            None => Lookup::Missing,
        }
    }

    /// Store a successful refresh, stamped with the current time.
    ///
    /// Call this when the fetch has completed, never before it starts.
    pub async fn set(&self, key: K, value: V) {
        self.set_at(key, value, Instant::now()).await;
    }

    /// Store a refresh that completed at `fetched_at`.
    ///
    /// Ignored if the cache already holds a refresh that completed later.
    /// Returns whether the value was stored.
    pub async fn set_at(&self, key: K, value: V, fetched_at: Instant) -> bool {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            if existing.fetched_at > fetched_at {
                debug!("[cache:{}] dropping out-of-order refresh for {key:?}", self.name);
                return false;
            }
        }
        entries.insert(key, CacheEntry { payload: value, fetched_at });
        true
    }
}
