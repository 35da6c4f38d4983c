//! Timeout wrapper for worker fetches
//!
//! Workers bound their own navigation, but extraction and CDP round-trips
//! after it are not covered. This puts a hard ceiling on the whole call.

use std::future::Future;
use std::time::Duration;

use crate::worker_pool::FetchError;

/// Run `operation` for at most `timeout`.
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err(FetchError::Timeout)` - The deadline passed first; the operation is dropped
/// * `Err(_)` - The operation's own error
pub async fn with_fetch_timeout<F, T>(operation: F, timeout: Duration) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_operation_times_out() {
        let result: Result<(), _> = with_fetch_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_millis(10),
        )
        .await;
        assert!(matches!(result, Err(FetchError::Timeout(d)) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let result: Result<(), _> =
            with_fetch_timeout(async { Err(FetchError::EmptyContent) }, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(FetchError::EmptyContent)));
    }
}
