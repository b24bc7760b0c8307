//! Store key builders shared by the cache and the rate limiter

use crate::core::constants::{CACHE_DEFAULT_PREFIX, CACHE_TAG_PREFIX};

/// Type-safe store key builder
pub struct CacheKey;

impl CacheKey {
    /// Namespaced entry key: `{prefix}:{key}`, default prefix `cache`
    pub fn entry(prefix: Option<&str>, key: &str) -> String {
        format!("{}:{}", prefix.unwrap_or(CACHE_DEFAULT_PREFIX), key)
    }

    /// Reverse-index set for a tag: `tag:{tag}`
    pub fn tag(tag: &str) -> String {
        format!("{CACHE_TAG_PREFIX}:{tag}")
    }

    /// Sliding-window set for one client: `{key_prefix}:{identifier}`
    pub fn rate_limit(key_prefix: &str, identifier: &str) -> String {
        format!("{key_prefix}:{identifier}")
    }
}
