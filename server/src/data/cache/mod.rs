//! Tagged TTL cache on top of the key-value store
//!
//! Entries are JSON-encoded and stored under `{prefix}:{key}`. Each tag is a
//! set at `tag:{tag}` listing the full keys of the entries carrying it, so a
//! whole group can be dropped with one call. A tag set lives at least an hour
//! past the longest-lived entry ever written under it and is never pruned;
//! invalidation tolerates members whose entry has already expired.
//!
//! Every operation fails open: a miss, `false` or `0` on any store problem.

mod key;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use key::CacheKey;

use crate::core::constants::{CACHE_DEFAULT_TTL_SECS, CACHE_TAG_TTL_BUFFER_SECS};
use crate::data::store::StoreHandle;

/// Cache manager providing typed, tag-aware access to the store
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: StoreHandle,
}

impl CacheManager {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Get a typed value; `None` on miss, store failure or undecodable bytes
    pub async fn get<T: DeserializeOwned>(&self, key: &str, prefix: Option<&str>) -> Option<T> {
        let full_key = CacheKey::entry(prefix, key);
        self.store
            .fail_open("cache_get", None, |store| async move {
                let Some(bytes) = store.get(&full_key).await? else {
                    tracing::trace!(key = %full_key, "Cache miss");
                    return Ok(None);
                };
                let value = serde_json::from_slice(&bytes)?;
                tracing::trace!(key = %full_key, "Cache hit");
                Ok(Some(value))
            })
            .await
    }

    /// Store a value for `ttl_secs` (default one hour) and register it under
    /// each tag
    ///
    /// Returns `false` if the value could not be encoded or written.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
        prefix: Option<&str>,
        tags: &[String],
    ) -> bool {
        let full_key = CacheKey::entry(prefix, key);
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key = %full_key, error = %e, "Failed to encode cache value");
                return false;
            }
        };
        let ttl = ttl_secs.unwrap_or(CACHE_DEFAULT_TTL_SECS);
        let tag_keys: Vec<String> = tags.iter().map(|tag| CacheKey::tag(tag)).collect();

        self.store
            .fail_open("cache_set", false, |store| async move {
                if tag_keys.is_empty() {
                    store.set_ex(&full_key, bytes, ttl).await?;
                } else {
                    let tag_ttl = ttl.saturating_add(CACHE_TAG_TTL_BUFFER_SECS);
                    store
                        .set_tagged(&full_key, bytes, ttl, &tag_keys, tag_ttl)
                        .await?;
                }
                Ok(true)
            })
            .await
    }

    /// Delete one entry. Returns `true` if the delete was issued.
    pub async fn delete(&self, key: &str, prefix: Option<&str>) -> bool {
        let full_key = CacheKey::entry(prefix, key);
        self.store
            .fail_open("cache_delete", false, |store| async move {
                store.delete(&full_key).await?;
                Ok(true)
            })
            .await
    }

    /// Delete every entry registered under `tag`, then the tag set itself
    ///
    /// Returns the number of member keys processed, including members whose
    /// entry had already expired. `0` when the tag is absent.
    ///
    /// Members are read before the tag set is deleted, so a concurrent `set`
    /// registering under `tag` in between keeps its entry but loses the tag
    /// registration; that entry stays reachable until its own TTL runs out.
    pub async fn invalidate_tag(&self, tag: &str) -> u64 {
        let tag_key = CacheKey::tag(tag);
        self.store
            .fail_open("cache_invalidate_tag", 0, |store| async move {
                let members = store.smembers(&tag_key).await?;
                if members.is_empty() {
                    return Ok(0);
                }
                try_join_all(members.iter().map(|member| store.delete(member))).await?;
                store.delete(&tag_key).await?;
                tracing::debug!(tag, count = members.len(), "Invalidated cache tag");
                Ok(members.len() as u64)
            })
            .await
    }

    /// Invalidate several tags concurrently and sum the counts
    pub async fn invalidate_tags(&self, tags: &[String]) -> u64 {
        join_all(tags.iter().map(|tag| self.invalidate_tag(tag)))
            .await
            .into_iter()
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::Deserialize;

    use crate::data::store::{KvStore, MemoryStore, StoreError};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Movie {
        id: u64,
        title: String,
    }

    fn movie(id: u64) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn memory_cache() -> (CacheManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheManager::new(StoreHandle::new(store.clone()));
        (cache, store)
    }

    /// Store whose every call fails
    struct FailingStore;

    fn down() -> StoreError {
        StoreError::Connection("connection refused".into())
    }

    #[async_trait]
    impl KvStore for FailingStore {
        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(down())
        }
        async fn set_ex(&self, _: &str, _: Vec<u8>, _: u64) -> Result<(), StoreError> {
            Err(down())
        }
        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(down())
        }
        async fn sadd(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(down())
        }
        async fn expire(&self, _: &str, _: u64) -> Result<bool, StoreError> {
            Err(down())
        }
        async fn extend_expiry(&self, _: &str, _: u64) -> Result<bool, StoreError> {
            Err(down())
        }
        async fn smembers(&self, _: &str) -> Result<Vec<String>, StoreError> {
            Err(down())
        }
        async fn srem(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Err(down())
        }
        async fn scard(&self, _: &str) -> Result<u64, StoreError> {
            Err(down())
        }
        async fn zadd(&self, _: &str, _: &str, _: i64) -> Result<(), StoreError> {
            Err(down())
        }
        async fn zrem_range_by_score(&self, _: &str, _: i64, _: i64) -> Result<u64, StoreError> {
            Err(down())
        }
        async fn zcard(&self, _: &str) -> Result<u64, StoreError> {
            Err(down())
        }
        async fn health_check(&self) -> Result<(), StoreError> {
            Err(down())
        }
        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (cache, store) = memory_cache();
        assert!(cache.set("movie:1", &movie(1), None, None, &[]).await);

        let cached: Option<Movie> = cache.get("movie:1", None).await;
        assert_eq!(cached, Some(movie(1)));
        assert!(store.get("cache:movie:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prefix_isolates_keys() {
        let (cache, _) = memory_cache();
        cache.set("movie:1", &movie(1), None, Some("tmdb"), &[]).await;

        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
        assert_eq!(cache.get::<Movie>("movie:1", Some("tmdb")).await, Some(movie(1)));
    }

    #[tokio::test]
    async fn test_get_miss() {
        let (cache, _) = memory_cache();
        assert_eq!(cache.get::<Movie>("movie:404", None).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let (cache, store) = memory_cache();
        store
            .set_ex("cache:movie:1", b"not json".to_vec(), 60)
            .await
            .unwrap();
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let (cache, _) = memory_cache();
        cache.set("movie:1", &movie(1), Some(60), None, &[]).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get::<Movie>("movie:1", None).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_one_hour() {
        let (cache, _) = memory_cache();
        cache.set("movie:1", &movie(1), None, None, &[]).await;

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(cache.get::<Movie>("movie:1", None).await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_set_outlives_entry_by_an_hour() {
        let (cache, store) = memory_cache();
        cache
            .set("movie:1", &movie(1), Some(60), None, &tags(&["movie"]))
            .await;

        tokio::time::advance(Duration::from_secs(60 + 3599)).await;
        assert_eq!(store.scard("tag:movie").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.scard("tag:movie").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_entry_keeps_longer_tag_expiry() {
        let (cache, _) = memory_cache();
        cache
            .set("movie:1", &movie(1), Some(10_000), None, &tags(&["movie"]))
            .await;
        cache
            .set("movie:2", &movie(2), Some(10), None, &tags(&["movie"]))
            .await;

        tokio::time::advance(Duration::from_secs(5_000)).await;
        assert!(cache.get::<Movie>("movie:1", None).await.is_some());

        assert_eq!(cache.invalidate_tag("movie").await, 2);
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (cache, _) = memory_cache();
        cache.set("movie:1", &movie(1), None, None, &[]).await;
        assert!(cache.delete("movie:1", None).await);
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_tag_scope() {
        let (cache, _) = memory_cache();
        cache
            .set("movie:1", &movie(1), None, Some("tmdb"), &tags(&["movie", "movie:1"]))
            .await;
        cache
            .set("movie:2", &movie(2), None, Some("tmdb"), &tags(&["movie", "movie:2"]))
            .await;

        assert_eq!(cache.invalidate_tag("movie:1").await, 1);

        assert_eq!(cache.get::<Movie>("movie:1", Some("tmdb")).await, None);
        assert_eq!(cache.get::<Movie>("movie:2", Some("tmdb")).await, Some(movie(2)));
    }

    #[tokio::test]
    async fn test_invalidate_tag_twice() {
        let (cache, store) = memory_cache();
        cache
            .set("movie:1", &movie(1), None, None, &tags(&["movie"]))
            .await;
        cache
            .set("movie:2", &movie(2), None, None, &tags(&["movie"]))
            .await;

        assert_eq!(cache.invalidate_tag("movie").await, 2);
        assert_eq!(store.scard("tag:movie").await.unwrap(), 0);
        assert_eq!(cache.invalidate_tag("movie").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_counts_expired_members() {
        let (cache, _) = memory_cache();
        cache
            .set("movie:1", &movie(1), Some(10), None, &tags(&["movie"]))
            .await;
        cache
            .set("movie:2", &movie(2), Some(600), None, &tags(&["movie"]))
            .await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.invalidate_tag("movie").await, 2);
        assert_eq!(cache.get::<Movie>("movie:2", None).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_tags_sums_counts() {
        let (cache, _) = memory_cache();
        cache
            .set("trending:all:day", &movie(1), None, None, &tags(&["trending"]))
            .await;
        cache
            .set("discover:movies", &movie(2), None, None, &tags(&["discover"]))
            .await;
        cache
            .set("discover:tv", &movie(3), None, None, &tags(&["discover"]))
            .await;

        let count = cache
            .invalidate_tags(&tags(&["trending", "discover", "unknown"]))
            .await;
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_failing_store_degrades() {
        let cache = CacheManager::new(StoreHandle::new(Arc::new(FailingStore)));

        assert!(!cache.set("movie:1", &movie(1), None, None, &tags(&["movie"])).await);
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
        assert!(!cache.delete("movie:1", None).await);
        assert_eq!(cache.invalidate_tag("movie").await, 0);
        assert_eq!(cache.invalidate_tags(&tags(&["movie", "tv"])).await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let cache = CacheManager::new(StoreHandle::unavailable());

        assert!(!cache.set("movie:1", &movie(1), None, None, &[]).await);
        assert_eq!(cache.get::<Movie>("movie:1", None).await, None);
        assert!(!cache.delete("movie:1", None).await);
        assert_eq!(cache.invalidate_tag("movie").await, 0);
    }
}
