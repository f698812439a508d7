use async_trait::async_trait;
use bytes::Bytes;
use cache_aside::CacheBackend;
use moka::Expiry;
use moka::future::Cache;
use shared::{Error, Result};
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: Bytes,
    ttl: Option<Duration>,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Moka-based in-process backend with per-entry TTL.
///
/// A zero TTL stores the value without expiry. Bounded caches may evict
/// entries before they expire.
pub struct MokaCache {
    cache: Cache<String, Entry>,
}

impl MokaCache {
    /// Create a new unbounded Moka cache
    pub fn new_unbounded() -> Self {
        Self::new("cache-aside".to_string(), None)
    }

    /// Create a new bounded Moka cache with max entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self::new("cache-aside".to_string(), Some(max_entries))
    }

    /// Create a Moka cache from name and optional capacity
    pub fn new(name: String, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(&name).expire_after(PerEntryTtl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new_unbounded()
    }
}

#[async_trait]
impl CacheBackend for MokaCache {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let ttl = (!ttl.is_zero()).then_some(ttl);
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        match self.cache.get(key).await {
            Some(entry) => Ok(entry.value),
            None => Err(Error::NotFound), // Either doesn't exist or TTL expired
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
