//! Data structures and constants for web search functionality

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Longest query accepted, in bytes
pub const MAX_QUERY_LENGTH: usize = 1000;

/// Retries after the first attempt for transient search failures
pub const MAX_RETRIES: u32 = 2;

/// Upper bound on `limit` for one search
pub const MAX_RESULTS: usize = 50;

/// Fixed SearXNG form fields sent with every query
pub const SEARCH_TIME_RANGE: &str = "week";
pub const SEARCH_SAFESEARCH: &str = "2";
pub const SEARCH_PAGE: &str = "1";

// =============================================================================
// Data Structures
// =============================================================================

/// One search call: the query plus the engine selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    /// Comma-separated SearXNG engine ids
    pub enabled_engines: String,
    pub disabled_engines: String,
}

/// A single search result with rank, title, URL, and snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result ranking (1-indexed)
    pub rank: usize,

    /// Page title
    pub title: String,

    /// Page URL
    pub url: String,

    /// Description snippet from search results
    pub snippet: String,
}

/// Collection of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Search query that produced these results
    pub query: String,

    /// List of search results
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    /// Create new `SearchResults`
    #[must_use]
    pub fn new(query: String, results: Vec<SearchResult>) -> Self {
        Self { query, results }
    }

    /// Result URLs in rank order
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.results.iter().map(|r| r.url.clone()).collect()
    }
}
