//! Exponential backoff with jitter for search requests

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::errors::SearchError;

/// Retry `f` while it fails with a retryable error.
///
/// Attempt `n` (0-based) sleeps `base_delay * 2^n` plus up to one
/// `base_delay` of jitter before the next try. Non-retryable errors are
/// returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(
    f: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, SearchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }
                if retries >= max_retries {
                    warn!("Max retries ({}) exceeded: {}", max_retries, e);
                    return Err(e);
                }

                let base_ms = u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX);
                let jitter = if base_ms == 0 {
                    0
                } else {
                    rand::rng().random_range(0..base_ms)
                };
                let delay = base_ms.saturating_mul(2u64.pow(retries)).saturating_add(jitter);
                warn!(
                    "Retryable error, attempt {}/{}, retrying in {}ms: {}",
                    retries + 1,
                    max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                retries += 1;
            }
        }
    }
}
