//! Time-boxed caching with an injectable clock.
//!
//! [`TtlCache`] is a plain synchronous map whose entries expire after a
//! fixed time-to-live. [`SharedCache`] wraps one for async callers and
//! ensures that concurrent misses for the same cache share a single
//! outstanding fetch. Stale reads within the TTL window are expected.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.origin + offset
    }
}

#[derive(Debug)]
struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// A map whose entries expire `ttl` after they were stored.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: BTreeMap<K, Entry<V>>,
}

impl<K: Ord, V: Clone> TtlCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the value for `key` unless it is missing or expired.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value`, resetting its age.
    pub fn set(&mut self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, Entry { stored_at, value });
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An async, shareable [`TtlCache`] keyed by string.
///
/// The lock is held while a miss is being fetched, so concurrent callers
/// wait for the one in-flight request instead of issuing their own.
/// Failed fetches are not cached.
#[derive(Debug)]
pub struct SharedCache<V> {
    inner: tokio::sync::Mutex<TtlCache<String, V>>,
}

impl<V: Clone> SharedCache<V> {
    /// Creates an empty shared cache.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(TtlCache::new(ttl, clock)),
        }
    }

    /// Returns the fresh cached value for `key`, or runs `fetch`, stores
    /// its result and returns it.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fetch` returns. Nothing is cached in that
    /// case.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut cache = self.inner.lock().await;

        if let Some(value) = cache.get(key) {
            log::trace!("cache hit for '{key}'");
            return Ok(value);
        }

        log::debug!("cache miss for '{key}', fetching");
        let value = fetch().await?;

        let purged = cache.purge_expired();
        if purged > 0 {
            log::trace!("purged {purged} expired entries");
        }
        cache.set(key.to_string(), value.clone());
        log::trace!("cache now holds {} entries", cache.len());

        Ok(value)
    }
}
