//! In-memory LRU response cache with per-entry TTL

use super::client::HttpResponse;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default number of cached responses
pub const DEFAULT_CACHE_SIZE: usize = 1000;
/// Default entry lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    tick: u64,
}

/// Entries plus a recency index: lower tick = less recently used.
#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    recency: BTreeMap<u64, String>,
    next_tick: u64,
}

impl<V: Clone> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now > entry.expires_at {
            self.remove(key);
            return None;
        }

        let old_tick = entry.tick;
        let tick = self.bump();
        self.recency.remove(&old_tick);
        self.recency.insert(tick, key.to_string());

        let entry = self.entries.get_mut(key)?;
        entry.tick = tick;
        Some(entry.value.clone())
    }

    fn insert(&mut self, key: String, value: V, expires_at: Instant, max_size: usize) {
        if let Some(old) = self.entries.remove(&key) {
            self.recency.remove(&old.tick);
        } else {
            while self.entries.len() >= max_size {
                let Some((_, lru_key)) = self.recency.pop_first() else {
                    break;
                };
                self.entries.remove(&lru_key);
            }
        }

        let tick = self.bump();
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                tick,
            },
        );
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.tick);
                true
            }
            None => false,
        }
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Bounded cache evicting the least recently used entry when full.
///
/// Expired entries are dropped lazily on lookup. All operations take an
/// internal async mutex, so one cache can be shared between clients.
#[derive(Debug)]
pub struct ResponseCache<V = HttpResponse> {
    inner: Mutex<CacheInner<V>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `max_size` entries
    pub fn new(max_size: usize, default_ttl: Duration) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::config("max_size", "must be greater than 0"));
        }
        if default_ttl.is_zero() {
            return Err(Error::config("default_ttl", "must be greater than 0"));
        }

        Ok(Self {
            inner: Mutex::new(CacheInner::new()),
            max_size,
            default_ttl,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry and mark it most recently used
    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().await.get(key, Instant::now())
    }

    /// Store a value with the default TTL
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value that expires after `ttl`
    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.inner
            .lock()
            .await
            .insert(key.into(), value, expires_at, self.max_size);
    }

    /// Remove an entry, returning whether it was present
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.lock().await.remove(key)
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.inner.lock().await.purge_expired(Instant::now())
    }
}

/// Derive a cache key from a URL and its query parameters.
///
/// Parameters are sorted by key (then value) and form-encoded, so the key does
/// not depend on the order they were supplied in.
pub fn build_cache_key(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
