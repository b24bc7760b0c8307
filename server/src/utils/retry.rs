//! Async retry utilities with exponential backoff

use std::time::Duration;

/// Retry an async operation with exponential backoff.
///
/// Only errors accepted by `is_retryable` are retried; anything else is
/// returned immediately. The last error is returned once `max_attempts` is
/// exhausted.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    max_attempts: u32,
    base_delay_ms: u64,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !is_retryable(&e) {
                    return Err(e);
                }
                let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempts - 1));
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
