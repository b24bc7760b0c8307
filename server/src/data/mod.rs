//! Data layer: key-value store adapter, tagged cache and rate limiting

pub mod cache;
pub mod rate_limit;
pub mod store;

pub use cache::{CacheKey, CacheManager};
pub use rate_limit::{RateLimitResult, RateLimiter, RateLimiters};
pub use store::{KvStore, MemoryStore, StoreError, StoreHandle};
