//! Error types for the cache layer.

/// Errors raised by a [`CacheStore`](super::CacheStore).
///
/// The manager never lets these reach a crawl request; they only surface on
/// the operational endpoints (stats, clear).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store could not be reached, or the manager is in its disabled window
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            Self::Unavailable(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
