//! Key-value store adapter
//!
//! Single construction point for the store shared by the cache and the rate
//! limiter. Backends:
//! - Redis-compatible server (production) - deadpool-redis pool
//! - In-memory (development, tests) - dashmap
//!
//! A missing or unreachable store is a normal operating state: the handle is
//! "unavailable" and every operation run through [`StoreHandle::fail_open`]
//! resolves to its caller-supplied default.

mod backend;
mod error;
mod memory;
mod redis;

use std::future::Future;
use std::sync::Arc;

pub use backend::KvStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::core::config::{StoreBackendType, StoreConfig};

/// Shared handle to an optional key-value store
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Option<Arc<dyn KvStore>>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl StoreHandle {
    /// A handle with no store behind it
    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { inner: Some(store) }
    }

    /// Build the store described by `config`
    ///
    /// Never fails: missing configuration or a failed connection is logged
    /// once here and yields an unavailable handle.
    pub async fn connect(config: &StoreConfig) -> Self {
        match config.backend {
            StoreBackendType::Disabled => {
                tracing::warn!("Key-value store disabled, caching and rate limiting are off");
                Self::unavailable()
            }
            StoreBackendType::Memory => {
                tracing::debug!("Initializing in-memory store");
                Self::new(Arc::new(MemoryStore::new()))
            }
            StoreBackendType::Redis => {
                let (Some(url), Some(token)) = (config.url.as_deref(), config.token.as_deref())
                else {
                    tracing::warn!(
                        "Store URL or token not configured, caching and rate limiting are off"
                    );
                    return Self::unavailable();
                };
                match RedisStore::connect(url, token).await {
                    Ok(store) => Self::new(Arc::new(store)),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Key-value store unreachable, caching and rate limiting are off"
                        );
                        Self::unavailable()
                    }
                }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Backend name, `"unavailable"` when there is no store
    pub fn backend_name(&self) -> &'static str {
        self.inner
            .as_ref()
            .map(|store| store.backend_name())
            .unwrap_or("unavailable")
    }

    /// Run a store operation, degrading to `default` when the store is
    /// unavailable or the operation fails
    ///
    /// Failures are logged at error level with the operation name.
    pub async fn fail_open<T, F, Fut>(&self, op: &'static str, default: T, f: F) -> T
    where
        F: FnOnce(Arc<dyn KvStore>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let Some(store) = self.inner.clone() else {
            return default;
        };
        match f(store).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(op, error = %e, "Store operation failed");
                default
            }
        }
    }

    /// Check connectivity; `Ok(false)` when there is no store
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        match &self.inner {
            Some(store) => store.health_check().await.map(|_| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> StoreConfig {
        StoreConfig {
            backend: StoreBackendType::Memory,
            url: None,
            token: None,
        }
    }

    #[tokio::test]
    async fn test_unavailable_returns_default() {
        let handle = StoreHandle::unavailable();
        assert!(!handle.is_available());
        assert_eq!(handle.backend_name(), "unavailable");

        let called = std::sync::atomic::AtomicBool::new(false);
        let value = handle
            .fail_open("get", 7, |_| {
                called.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(1) }
            })
            .await;
        assert_eq!(value, 7);
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_fail_open_on_error() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));
        let value = handle
            .fail_open("get", false, |_| async {
                Err(StoreError::Connection("reset by peer".into()))
            })
            .await;
        assert!(!value);
    }

    #[tokio::test]
    async fn test_fail_open_passes_success_through() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));
        let value = handle
            .fail_open("set", false, |store| async move {
                store.set_ex("k", b"v".to_vec(), 60).await?;
                Ok(true)
            })
            .await;
        assert!(value);
    }

    #[tokio::test]
    async fn test_connect_memory() {
        let handle = StoreHandle::connect(&memory_config()).await;
        assert!(handle.is_available());
        assert_eq!(handle.backend_name(), "memory");
        assert!(handle.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_disabled() {
        let config = StoreConfig {
            backend: StoreBackendType::Disabled,
            ..memory_config()
        };
        let handle = StoreHandle::connect(&config).await;
        assert!(!handle.is_available());
        assert!(!handle.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_redis_without_token_is_unavailable() {
        let config = StoreConfig {
            backend: StoreBackendType::Redis,
            url: Some("redis://localhost:6379".into()),
            token: None,
        };
        let handle = StoreHandle::connect(&config).await;
        assert!(!handle.is_available());
    }
}
