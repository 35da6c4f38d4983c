//! API-facing errors and their HTTP mapping

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::web_search::SearchError;

/// Seconds a client is told to wait after a pool-exhausted response
pub const RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    /// Every URL needed a worker and none became free in time
    #[error("all crawl workers are busy, retry later")]
    PoolExhausted,

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Internal(String),
}

/// Error details within an [`ErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ServiceError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            Self::Search(SearchError::NoResults(_)) => StatusCode::NOT_FOUND,
            Self::Search(SearchError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            Self::Search(_) => StatusCode::BAD_GATEWAY,
            Self::Cache(CacheError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cache(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::Search(SearchError::InvalidQuery(_)) => "invalid_request",
            Self::PoolExhausted => "pool_exhausted",
            Self::Search(SearchError::NoResults(_)) => "no_results",
            Self::Search(_) => "search_backend_error",
            Self::Cache(_) => "cache_error",
            Self::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, %status, "Request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                message: self.to_string(),
                error_type: self.error_type().to_string(),
            },
        };
        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::PoolExhausted) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServiceError::PoolExhausted.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ServiceError::from(SearchError::NoResults("q".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::from(SearchError::Request("refused".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::BadRequest("no urls".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn pool_exhausted_carries_retry_after() {
        let response = ServiceError::PoolExhausted.into_response();
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(RETRY_AFTER_SECS)
        );
    }
}
