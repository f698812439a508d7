use crate::codec;
use crate::ports::CacheBackend;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{BoxError, Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Return the value cached under `key`, or compute, store and return it.
///
/// Any failed read (miss, undecodable value, backend error) falls through to
/// `compute`. A compute failure is returned as [`Error::Compute`] and nothing
/// is written. A failed write after a successful compute is returned as-is and
/// the computed value is dropped.
///
/// Concurrent callers are not coordinated: on a shared miss each of them runs
/// `compute` and the last write wins.
pub async fn remember<C, T, E, F, Fut>(cache: &C, key: &str, ttl: Duration, compute: F) -> Result<T>
where
    C: CacheBackend + ?Sized,
    T: Serialize + DeserializeOwned,
    E: Into<BoxError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    match codec::get::<C, T>(cache, key).await {
        Ok(value) => {
            debug!(backend = cache.name(), key, "cache hit");
            return Ok(value);
        }
        Err(Error::NotFound) => {
            debug!(backend = cache.name(), key, "cache miss");
        }
        Err(Error::Decoding(err)) => {
            warn!(backend = cache.name(), key, %err, "discarding undecodable cached value");
        }
        Err(err) => {
            warn!(backend = cache.name(), key, %err, "cache read failed, computing");
        }
    }

    let value = compute().await.map_err(|e| Error::Compute(e.into()))?;
    codec::set(cache, key, &value, ttl).await?;
    Ok(value)
}
