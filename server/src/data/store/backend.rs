//! Key-value store trait definition

use async_trait::async_trait;

use super::error::StoreError;

/// Minimal key-value store interface shared by the cache and the rate limiter
///
/// Plain keys hold opaque bytes, sets back the tag index, and sorted sets back
/// the sliding-window counters. Semantics follow Redis: writing a set or sorted
/// set member to a key that holds a different type is an error, and removing
/// the last member of a set deletes the key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the bytes stored at `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store bytes at `key`, replacing any previous value, expiring after `ttl_secs`
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError>;

    /// Delete a key of any type. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Add a member to the set at `key`, creating it without expiry if absent
    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Set the expiry of an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Push the expiry of an existing key out to `ttl_secs` from now, never
    /// shortening it. A key without expiry gets one. Returns `true` if the
    /// expiry changed.
    async fn extend_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn scard(&self, key: &str) -> Result<u64, StoreError>;

    /// Add or re-score a member of the sorted set at `key`
    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<(), StoreError>;

    /// Remove sorted set members whose score lies in `min..=max`
    async fn zrem_range_by_score(&self, key: &str, min: i64, max: i64) -> Result<u64, StoreError>;

    async fn zcard(&self, key: &str) -> Result<u64, StoreError>;

    /// Write an entry and register it in each tag set
    ///
    /// Each tag set lives at least `tag_ttl_secs` from this write; an existing
    /// longer expiry is kept so the set never expires before a member. The default
    /// runs the commands one by one: a failure part-way leaves the entry
    /// untagged or a tag set without expiry until the next write to that tag.
    /// Backends with transactions override this.
    async fn set_tagged(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
        tag_keys: &[String],
        tag_ttl_secs: u64,
    ) -> Result<(), StoreError> {
        self.set_ex(key, value, ttl_secs).await?;
        for tag_key in tag_keys {
            self.sadd(tag_key, key).await?;
            self.extend_expiry(tag_key, tag_ttl_secs).await?;
        }
        Ok(())
    }

    /// Record one hit in a sliding window and return the hits left in it
    ///
    /// Adds `member` scored `score`, drops members scored before
    /// `window_start`, counts what remains and refreshes the key expiry.
    /// The default is not atomic; concurrent callers may observe each
    /// other's partial updates, which can only over-count.
    async fn record_hit(
        &self,
        key: &str,
        member: &str,
        score: i64,
        window_start: i64,
        ttl_secs: u64,
    ) -> Result<u64, StoreError> {
        self.zadd(key, member, score).await?;
        self.zrem_range_by_score(key, i64::MIN, window_start.saturating_sub(1))
            .await?;
        let count = self.zcard(key).await?;
        self.expire(key, ttl_secs).await?;
        Ok(count)
    }

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
