#![deny(clippy::all)]

use async_trait::async_trait;
use bytes::Bytes;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

// Ports are the pluggable extension points for underlying cache backends

/// Byte-oriented capability every backend adapter must provide.
///
/// Adapters normalize their protocol's "absent" signal into [`Error::NotFound`]
/// and every transport or protocol failure into [`Error::Backend`], so callers
/// can tell a miss from a failure without knowing which backend is in use.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove `key`. Backends without a delete operation keep this default.
    async fn delete(&self, key: &str) -> Result<()> {
        let _ = key;
        Err(Error::Backend(format!(
            "delete is not supported by the {} backend",
            self.name()
        )))
    }

    /// Short backend name used in logs and error messages.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<C> CacheBackend for Arc<C>
where
    C: CacheBackend + ?Sized,
{
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
