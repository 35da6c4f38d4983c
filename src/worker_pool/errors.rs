//! Error types for pool acquisition and per-URL fetches.

use std::time::Duration;

/// Errors from [`WorkerPool`](super::WorkerPool) itself
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// No worker became free before the acquire timeout
    #[error("worker pool exhausted after waiting {waited:?}")]
    Exhausted { waited: Duration },

    /// Shutdown has begun; no new acquisitions are accepted
    #[error("worker pool is shut down")]
    ShutDown,

    /// A worker session could not be created
    #[error("failed to launch worker: {0}")]
    Launch(String),
}

/// Errors from a single fetch on one worker
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The page could not be loaded (DNS, TLS, navigation aborted, ...)
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The page loaded but content could not be extracted from it
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Upstream answered with an error (reader service, HTTP status)
    #[error("http error: {0}")]
    Http(String),

    #[error("no content extracted")]
    EmptyContent,

    /// The underlying session died; the pool replaces the worker
    #[error("worker session lost: {0}")]
    SessionLost(String),
}

impl FetchError {
    /// Faults worth one more attempt on a (possibly different) worker
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Navigation(_) | Self::Http(_) | Self::SessionLost(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(FetchError::Navigation("reset".into()).is_retryable());
        assert!(!FetchError::EmptyContent.is_retryable());
        assert!(!FetchError::Extraction("bad html".into()).is_retryable());
    }

    #[test]
    fn exhausted_display_mentions_wait() {
        let err = PoolError::Exhausted {
            waited: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "worker pool exhausted after waiting 1.5s");
    }
}
