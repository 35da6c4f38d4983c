//! Search collaborator
//!
//! Resolves a query to a ranked URL list. The crawl pipeline only sees the
//! [`SearchBackend`] trait; [`SearxngClient`] is the production backend.

mod errors;
mod retry;
mod searxng;
mod types;

pub use errors::SearchError;
pub use retry::retry_with_backoff;
pub use searxng::SearxngClient;
pub use types::{
    MAX_QUERY_LENGTH, MAX_RESULTS, MAX_RETRIES, SearchParams, SearchResult, SearchResults,
};

use futures::future::BoxFuture;

/// Anything that can turn a query into ranked results
pub trait SearchBackend: Send + Sync {
    fn search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<SearchResults, SearchError>>;

    /// Backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Trim and bound a query before any network work
pub fn validate_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(
            "query cannot be empty or whitespace-only".into(),
        ));
    }
    if trimmed.len() > MAX_QUERY_LENGTH {
        return Err(SearchError::InvalidQuery(format!(
            "query is too long ({} characters, maximum {MAX_QUERY_LENGTH})",
            trimmed.len()
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_trimmed_and_bounded() {
        assert_eq!(validate_query("  rust pools ").unwrap(), "rust pools");
        assert!(matches!(validate_query("   "), Err(SearchError::InvalidQuery(_))));
        let long = "x".repeat(MAX_QUERY_LENGTH + 1);
        assert!(matches!(validate_query(&long), Err(SearchError::InvalidQuery(_))));
    }
}
