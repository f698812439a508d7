use cache_aside::CacheBackend;
use shared::Result;
use shared::config::Config;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use storage_engine::{MemcachedCache, MokaCache, RespCache};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Memory,
    Redis,
    Valkey,
    Memcached,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "moka" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            "valkey" => Ok(BackendKind::Valkey),
            "memcached" | "memcache" => Ok(BackendKind::Memcached),
            other => Err(format!(
                "unknown backend {other:?}, expected memory, redis, valkey or memcached"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Memory => "memory",
            BackendKind::Redis => "redis",
            BackendKind::Valkey => "valkey",
            BackendKind::Memcached => "memcached",
        };
        f.write_str(name)
    }
}

impl BackendKind {
    /// Read `CACHE_BACKEND`, defaulting to the in-process store.
    pub fn from_env() -> std::result::Result<Self, String> {
        match std::env::var("CACHE_BACKEND") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse(),
            _ => Ok(BackendKind::default()),
        }
    }

    pub async fn build(self, config: &Config) -> Result<Arc<dyn CacheBackend>> {
        let backend: Arc<dyn CacheBackend> = match self {
            BackendKind::Memory => Arc::new(MokaCache::default()),
            BackendKind::Redis => Arc::new(RespCache::redis(config).await?),
            BackendKind::Valkey => Arc::new(RespCache::valkey(config).await?),
            BackendKind::Memcached => Arc::new(MemcachedCache::connect(config).await?),
        };
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!("redis".parse::<BackendKind>(), Ok(BackendKind::Redis));
        assert_eq!(" Valkey ".parse::<BackendKind>(), Ok(BackendKind::Valkey));
        assert_eq!("memcache".parse::<BackendKind>(), Ok(BackendKind::Memcached));
        assert_eq!("moka".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("dynamo".parse::<BackendKind>().is_err());
    }

    #[tokio::test]
    async fn test_build_memory_backend() {
        let backend = BackendKind::Memory.build(&Config::new()).await.unwrap();
        assert_eq!(backend.name(), "memory");
    }
}
