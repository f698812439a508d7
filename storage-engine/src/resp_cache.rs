//! Redis and Valkey backends.
//!
//! Both stores speak RESP, so a single client covers them; the flavor only
//! changes how the backend names itself in logs and errors.

use crate::with_deadline;
use async_trait::async_trait;
use bytes::Bytes;
use cache_aside::CacheBackend;
use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use shared::config::Config;
use shared::{Error, Result};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_PORT: u16 = 6379;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    Redis,
    Valkey,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Redis => "redis",
            Flavor::Valkey => "valkey",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RESP backend over a multiplexed, auto-reconnecting connection.
///
/// The connection manager is cheap to clone and safe to share between tasks,
/// so every call works on its own handle.
#[derive(Clone)]
pub struct RespCache {
    conn: ConnectionManager,
    flavor: Flavor,
    timeout: Option<Duration>,
}

impl RespCache {
    pub async fn redis(config: &Config) -> Result<Self> {
        Self::connect(Flavor::Redis, config).await
    }

    pub async fn valkey(config: &Config) -> Result<Self> {
        Self::connect(Flavor::Valkey, config).await
    }

    /// Connect and verify the server answers `PING`.
    pub async fn connect(flavor: Flavor, config: &Config) -> Result<Self> {
        let addr = config.addr(DEFAULT_PORT);
        info!("Connecting to {} at {} (db {})", flavor, addr, config.database);

        let url = connection_url(config)?;
        let client = Client::open(url.as_str()).map_err(|e| command_error(flavor, "open", e))?;

        let mut conn = with_deadline(config.timeout, async {
            ConnectionManager::new(client)
                .await
                .map_err(|e| command_error(flavor, "connect", e))
        })
        .await?;

        let pong: String = with_deadline(config.timeout, async {
            redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| command_error(flavor, "ping", e))
        })
        .await?;

        if pong != "PONG" {
            return Err(Error::Backend(format!(
                "{flavor} ping returned {pong:?} instead of PONG"
            )));
        }

        info!("{} connection established", flavor);

        Ok(Self {
            conn,
            flavor,
            timeout: config.timeout,
        })
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }
}

/// `redis://[:password@]host:port/db` with the password percent-encoded.
fn connection_url(config: &Config) -> Result<Url> {
    let raw = format!("redis://{}/{}", config.addr(DEFAULT_PORT), config.database);
    let mut url = Url::parse(&raw).map_err(|e| Error::Backend(format!("invalid address {raw}: {e}")))?;

    if let Some(password) = config.password() {
        url.set_password(Some(password))
            .map_err(|_| Error::backend("password cannot be set on this address"))?;
    }

    Ok(url)
}

fn command_error(flavor: Flavor, op: &str, err: RedisError) -> Error {
    Error::Backend(format!("{flavor} {op} failed: {err}"))
}

/// Milliseconds for `PX`, or `None` for values that should not expire.
fn expiry_millis(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        return None;
    }
    Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1))
}

#[async_trait]
impl CacheBackend for RespCache {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(&value[..]);
        if let Some(ms) = expiry_millis(ttl) {
            cmd.arg("PX").arg(ms);
        }

        with_deadline(self.timeout, async {
            cmd.query_async::<()>(&mut conn).await.map_err(|e| {
                warn!("{} SET failed for {}: {}", self.flavor, key, e);
                command_error(self.flavor, "set", e)
            })
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let mut conn = self.conn.clone();

        let value: Option<Vec<u8>> = with_deadline(self.timeout, async {
            redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    warn!("{} GET failed for {}: {}", self.flavor, key, e);
                    command_error(self.flavor, "get", e)
                })
        })
        .await?;

        value.map(Bytes::from).ok_or(Error::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        with_deadline(self.timeout, async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| {
                    warn!("{} DEL failed for {}: {}", self.flavor, key, e);
                    command_error(self.flavor, "delete", e)
                })
        })
        .await
    }

    fn name(&self) -> &'static str {
        self.flavor.as_str()
    }
}

impl fmt::Debug for RespCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RespCache")
            .field("flavor", &self.flavor)
            .field("timeout", &self.timeout)
            .finish()
    }
}
