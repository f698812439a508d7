//! Backend adapters for the cache-aside facade.

pub mod memcached;
pub mod moka_cache;
pub mod resp_cache;

pub use memcached::MemcachedCache;
pub use moka_cache::MokaCache;
pub use resp_cache::{Flavor, RespCache};

use shared::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Run a remote call under the adapter's deadline, if one is configured.
pub(crate) async fn with_deadline<T>(
    timeout: Option<Duration>,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| Error::Backend(format!("deadline of {limit:?} exceeded")))?,
        None => call.await,
    }
}
