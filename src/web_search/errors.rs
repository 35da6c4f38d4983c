//! Errors from the search collaborator

use crate::utils::string_utils::preview;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// The request never got an answer (connect, timeout, TLS)
    #[error("search request failed: {0}")]
    Request(String),

    /// SearXNG answered with a non-success status
    #[error("search backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON
    #[error("could not parse search response: {0}")]
    Parse(String),

    #[error("no search results for '{0}'")]
    NoResults(String),

    #[error("invalid search query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: preview(body, 200),
        }
    }

    /// Transient failures worth another attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::NoResults(_) | Self::InvalidQuery(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_retry() {
        assert!(SearchError::Request("reset".into()).is_retryable());
        assert!(SearchError::status(503, "busy").is_retryable());
        assert!(SearchError::status(429, "slow down").is_retryable());
        assert!(!SearchError::status(403, "forbidden").is_retryable());
        assert!(!SearchError::NoResults("q".into()).is_retryable());
        assert!(!SearchError::Parse("eof".into()).is_retryable());
    }
}
