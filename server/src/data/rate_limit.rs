//! Sliding-window rate limiter on the key-value store
//!
//! # Algorithm
//!
//! Each identifier owns a sorted set of hits scored by their timestamp in
//! milliseconds. A check records the hit, drops hits scored before the start
//! of the current window and counts what is left. The request is allowed
//! while that count stays within the budget; rejected requests still record a
//! hit.
//!
//! # Known Limitations
//!
//! **Window Boundary Burst**: window starts are aligned to multiples of the
//! window length, so a client can spend a full budget at the end of one window
//! and another at the start of the next. With 30 req/min that is up to 60
//! requests in a couple of seconds.
//!
//! Every failure fails open: the request is allowed and reported as the first
//! of its window.

use chrono::Utc;

use super::cache::CacheKey;
use super::store::StoreHandle;
use crate::core::config::{RateLimitBudget, RateLimitConfig};
use crate::core::constants::RATE_LIMIT_KEY_EXPIRY_BUFFER_SECS;

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Requests remaining in the window
    pub remaining: u32,
    /// Epoch milliseconds at which the current window ends
    pub reset_time: u64,
    /// Requests counted in the current window, this one included
    pub total_requests: u64,
}

impl RateLimitResult {
    /// Whole seconds until the window ends, at least 1
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_time.saturating_sub(now_ms).div_ceil(1000).max(1)
    }
}

/// Rate limiter for one endpoint family
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: StoreHandle,
    budget: RateLimitBudget,
}

impl RateLimiter {
    pub fn new(store: StoreHandle, budget: RateLimitBudget) -> Self {
        Self { store, budget }
    }

    pub fn budget(&self) -> &RateLimitBudget {
        &self.budget
    }

    /// Record a request from `identifier` and decide whether it may proceed
    pub async fn check_limit(&self, identifier: &str) -> RateLimitResult {
        self.check_limit_at(identifier, now_ms()).await
    }

    /// [`check_limit`](Self::check_limit) with an explicit clock
    pub async fn check_limit_at(&self, identifier: &str, now_ms: u64) -> RateLimitResult {
        let window_ms = self.budget.window_ms.max(1);
        let max_requests = self.budget.max_requests;
        let window_start = now_ms / window_ms * window_ms;
        let reset_time = window_start + window_ms;

        let fallback = RateLimitResult {
            allowed: true,
            remaining: max_requests.saturating_sub(1),
            reset_time,
            total_requests: 1,
        };
        if !self.store.is_available() {
            return fallback;
        }

        let key = CacheKey::rate_limit(&self.budget.key_prefix, identifier);
        let member = format!("{now_ms}-{:016x}", rand::random::<u64>());
        let ttl_secs = window_ms.div_ceil(1000) + RATE_LIMIT_KEY_EXPIRY_BUFFER_SECS;
        let score = i64::try_from(now_ms).unwrap_or(i64::MAX);
        let start = i64::try_from(window_start).unwrap_or(i64::MAX);

        let count = self
            .store
            .fail_open("rate_limit_check", None, |store| async move {
                let count = store
                    .record_hit(&key, &member, score, start, ttl_secs)
                    .await?;
                Ok(Some(count))
            })
            .await;
        let Some(count) = count else {
            return fallback;
        };

        let allowed = count <= u64::from(max_requests);
        let remaining = u64::from(max_requests)
            .saturating_sub(count)
            .try_into()
            .unwrap_or(0u32);

        tracing::trace!(
            prefix = %self.budget.key_prefix,
            %identifier,
            count,
            max_requests,
            allowed,
            "Rate limit check"
        );

        RateLimitResult {
            allowed,
            remaining,
            reset_time,
            total_requests: count,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// One limiter per endpoint family, each with its own budget and key prefix
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub search: RateLimiter,
    pub discover: RateLimiter,
    pub lists: RateLimiter,
}

impl RateLimiters {
    pub fn new(store: StoreHandle, config: &RateLimitConfig) -> Self {
        Self {
            search: RateLimiter::new(store.clone(), config.search.clone()),
            discover: RateLimiter::new(store.clone(), config.discover.clone()),
            lists: RateLimiter::new(store, config.lists.clone()),
        }
    }
}
