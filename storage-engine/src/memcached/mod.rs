//! Memcached backend speaking the text protocol over a single TCP connection.

pub mod protocol;

use crate::with_deadline;
use async_trait::async_trait;
use bytes::Bytes;
use cache_aside::CacheBackend;
use futures::{SinkExt, StreamExt};
use protocol::{MemcachedCodec, Request, Response, exptime, validate_key};
use shared::config::Config;
use shared::{Error, Result};
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 11211;

type Connection = Framed<TcpStream, MemcachedCodec>;

/// Memcached backend.
///
/// Requests are serialized over one connection, dialled on first use. A
/// connection whose round-trip did not complete (I/O or framing error, missed
/// deadline, cancelled caller) is dropped and replaced on the next call.
pub struct MemcachedCache {
    addr: String,
    timeout: Option<Duration>,
    conn: Mutex<Option<Connection>>,
}

impl MemcachedCache {
    /// Build the client without dialling.
    pub fn new(config: &Config) -> Self {
        if config.password().is_some() {
            warn!("memcached text protocol has no authentication, ignoring password");
        }
        if config.database != 0 {
            warn!("memcached has no numbered databases, ignoring database {}", config.database);
        }

        Self {
            addr: config.addr(DEFAULT_PORT),
            timeout: config.timeout,
            conn: Mutex::new(None),
        }
    }

    /// Build the client and dial immediately, so a bad address fails here.
    pub async fn connect(config: &Config) -> Result<Self> {
        let cache = Self::new(config);
        {
            let mut slot = cache.conn.lock().await;
            let conn = with_deadline(cache.timeout, dial(&cache.addr)).await?;
            *slot = Some(conn);
        }
        Ok(cache)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one request and read its response.
    ///
    /// The connection leaves its slot for the round-trip and only goes back
    /// once a full response has been read. A call that errors, times out or is
    /// dropped mid-flight leaves the slot empty.
    async fn call(&self, request: Request) -> Result<Response> {
        let mut slot = self.conn.lock().await;
        let conn = slot.take();
        let (conn, response) = with_deadline(self.timeout, exchange(conn, &self.addr, request)).await?;
        *slot = Some(conn);
        Ok(response)
    }
}

async fn dial(addr: &str) -> Result<Connection> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| Error::Backend(format!("memcached connect to {addr} failed: {e}")))?;
    stream.set_nodelay(true).ok();
    info!("Connected to memcached at {}", addr);
    Ok(Framed::new(stream, MemcachedCodec))
}

async fn exchange(conn: Option<Connection>, addr: &str, request: Request) -> Result<(Connection, Response)> {
    let mut conn = match conn {
        Some(conn) => conn,
        None => dial(addr).await?,
    };

    conn.send(request)
        .await
        .map_err(|e| Error::Backend(format!("memcached write failed: {e}")))?;

    match conn.next().await {
        Some(Ok(response)) => Ok((conn, response)),
        Some(Err(e)) => Err(Error::Backend(format!("memcached read failed: {e}"))),
        None => Err(Error::backend("memcached closed the connection")),
    }
}

#[async_trait]
impl CacheBackend for MemcachedCache {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        validate_key(key)?;
        let request = Request::Set {
            key: key.to_string(),
            exptime: exptime(ttl, SystemTime::now()),
            value,
        };

        match self.call(request).await? {
            Response::Stored => Ok(()),
            other => Err(other.into_error("set")),
        }
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        validate_key(key)?;
        let request = Request::Get {
            key: key.to_string(),
        };

        match self.call(request).await? {
            Response::Value(value) => Ok(value),
            Response::Miss => Err(Error::NotFound),
            other => Err(other.into_error("get")),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let request = Request::Delete {
            key: key.to_string(),
        };

        match self.call(request).await? {
            Response::Deleted | Response::NotFound => Ok(()),
            other => Err(other.into_error("delete")),
        }
    }

    fn name(&self) -> &'static str {
        "memcached"
    }
}

impl fmt::Debug for MemcachedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemcachedCache")
            .field("addr", &self.addr)
            .field("timeout", &self.timeout)
            .finish()
    }
}
