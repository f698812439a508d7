//! Typed get/set on top of the byte-oriented [`CacheBackend`].
//!
//! Values are stored as JSON. Whatever [`set`] writes, [`get`] reads back for
//! the same `T`; asking for a different type than was written is a caller error
//! and surfaces as [`Error::Decoding`].

use crate::ports::CacheBackend;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::time::Duration;
use tracing::trace;

pub(crate) fn encode<T>(value: &T) -> Result<Bytes>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Error::Encoding)
}

pub(crate) fn decode<T>(data: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(data).map_err(Error::Decoding)
}

/// Serialize `value` and store it under `key`.
///
/// Fails with [`Error::Encoding`] before touching the backend when the value
/// cannot be serialized.
pub async fn set<C, T>(cache: &C, key: &str, value: &T, ttl: Duration) -> Result<()>
where
    C: CacheBackend + ?Sized,
    T: Serialize + ?Sized,
{
    let data = encode(value)?;
    trace!(backend = cache.name(), key, bytes = data.len(), "set");
    cache.set(key, data, ttl).await
}

/// Fetch `key` and deserialize it as `T`.
///
/// [`Error::NotFound`] means nothing usable is stored; [`Error::Decoding`]
/// means something is stored but it is not a `T`.
pub async fn get<C, T>(cache: &C, key: &str) -> Result<T>
where
    C: CacheBackend + ?Sized,
    T: DeserializeOwned,
{
    let data = cache.get(key).await?;
    trace!(backend = cache.name(), key, bytes = data.len(), "get");
    decode(&data)
}

pub async fn delete<C>(cache: &C, key: &str) -> Result<()>
where
    C: CacheBackend + ?Sized,
{
    cache.delete(key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::{Deserialize, Serializer};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MapCache {
        data: Mutex<HashMap<String, Bytes>>,
        sets: AtomicUsize,
    }

    #[async_trait]
    impl CacheBackend for MapCache {
        async fn set(&self, key: &str, value: Bytes, _ttl: Duration) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.data.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Bytes> {
            self.data
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or(Error::NotFound)
        }

        fn name(&self) -> &'static str {
            "map"
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not serializable"))
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MapCache::default();
        let user = User {
            name: "test".to_string(),
            age: 30,
        };

        set(&cache, "user:1", &user, TTL).await.unwrap();
        let got: User = get(&cache, "user:1").await.unwrap();
        assert_eq!(got, user);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let cache = MapCache::default();
        let result = get::<_, User>(&cache, "user:2").await;
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_get_corrupt_is_decoding_error() {
        let cache = MapCache::default();
        cache
            .data
            .lock()
            .unwrap()
            .insert("bad".to_string(), Bytes::from_static(b"{invalid"));

        let result = get::<_, User>(&cache, "bad").await;
        assert!(matches!(result, Err(Error::Decoding(_))));
    }

    #[tokio::test]
    async fn test_get_wrong_type_is_decoding_error() {
        let cache = MapCache::default();
        set(&cache, "n", &42u32, TTL).await.unwrap();

        let result = get::<_, User>(&cache, "n").await;
        assert!(matches!(result, Err(Error::Decoding(_))));
    }

    #[tokio::test]
    async fn test_encoding_error_skips_backend() {
        let cache = MapCache::default();

        let result = set(&cache, "fail", &Unserializable, TTL).await;
        assert!(matches!(result, Err(Error::Encoding(_))));
        assert_eq!(cache.sets.load(Ordering::SeqCst), 0);
        assert!(cache.data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_falls_back_to_unsupported() {
        let cache = MapCache::default();
        let err = delete(&cache, "user:1").await.unwrap_err();
        assert!(err.is_backend());
        assert!(err.to_string().contains("map"));
    }

    #[tokio::test]
    async fn test_unsized_values() {
        let cache = MapCache::default();
        set(&cache, "greeting", "hello", TTL).await.unwrap();
        set(&cache, "list", &[1u8, 2, 3][..], TTL).await.unwrap();

        let greeting: String = get(&cache, "greeting").await.unwrap();
        let list: Vec<u8> = get(&cache, "list").await.unwrap();
        assert_eq!(greeting, "hello");
        assert_eq!(list, vec![1, 2, 3]);
    }
}
