use crate::ports::CacheBackend;
use crate::{codec, remember};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{BoxError, Result};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Typed cache handle over an injected backend.
///
/// Cloning is cheap; clones share the same backend client.
#[derive(Clone)]
pub struct CacheAside {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl CacheAside {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            default_ttl: Self::DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        codec::get(self.backend.as_ref(), key).await
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        codec::set(self.backend.as_ref(), key, value, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        codec::delete(self.backend.as_ref(), key).await
    }

    pub async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<BoxError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        remember::remember(self.backend.as_ref(), key, ttl, compute).await
    }

    /// [`remember`](Self::remember) with the handle's default TTL.
    pub async fn remember_default<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<BoxError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.remember(key, self.default_ttl, compute).await
    }
}

impl Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("backend", &self.backend.name())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
