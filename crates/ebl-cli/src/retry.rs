// Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use ebl_core::config::RetryConfig;

/// Delay before attempt `attempt + 1`, doubling from the initial backoff and
/// capped at the maximum.
pub fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(32);
    let ms = policy
        .initial_backoff_ms
        .saturating_mul(1u64 << shift)
        .min(policy.max_backoff_ms);
    Duration::from_millis(ms)
}

/// Run `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// `op` receives the 1-based attempt number. The last error is returned
/// unchanged when every attempt fails.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryConfig, what: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => {
                warn!("{what} failed after {attempt} attempts: {e:#}");
                return Err(e);
            }
            Err(e) => {
                let delay = backoff_delay(policy, attempt);
                warn!(
                    "{what} failed (attempt {attempt}/{}): {e:#}; retrying in {}ms",
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
