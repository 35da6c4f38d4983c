//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::cache::CacheStatus;
use crate::crawl_engine::{BatchResult, UrlFailure};
use crate::worker_pool::PoolStats;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `POST /search`: search, then crawl the result URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Defaults to `DEFAULT_SEARCH_LIMIT`
    #[serde(default)]
    pub limit: Option<usize>,
    /// Comma-separated engine ids; defaults to the configured list
    #[serde(default)]
    pub enabled_engines: Option<String>,
    #[serde(default)]
    pub disabled_engines: Option<String>,
    /// Skip cache reads for both the search and the crawl
    #[serde(default)]
    pub bypass_cache: bool,
}

/// `POST /crawl`: crawl an explicit URL list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub bypass_cache: bool,
}

/// `DELETE /cache/entry`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryRequest {
    pub url: String,
    #[serde(default)]
    pub instruction: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub content: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlResponse {
    /// The query the URLs came from, for `/search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// All contents joined with the separator, in URL order
    pub content: String,
    pub results: Vec<ContentItem>,
    pub success_count: usize,
    pub failed_urls: Vec<String>,
    /// The same failed URLs with their reasons
    pub failures: Vec<UrlFailure>,
    pub cache_hits: usize,
    pub newly_crawled: usize,
}

impl CrawlResponse {
    #[must_use]
    pub fn from_batch(batch: BatchResult, query: Option<String>) -> Self {
        let content = batch.combined_content();
        let failed_urls = batch.failed_urls();
        Self {
            query,
            content,
            success_count: batch.success_count(),
            results: batch
                .ordered_contents
                .into_iter()
                .map(|c| ContentItem {
                    content: c.content,
                    reference: c.reference,
                })
                .collect(),
            failed_urls,
            failures: batch.failures,
            cache_hits: batch.cache_hits,
            newly_crawled: batch.newly_crawled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the pool is shutting down or the cache is unreachable
    pub status: String,
    pub pool: PoolStats,
    pub cache: CacheStatus,
    pub search_backend: String,
    pub fetch_backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearCacheResponse {
    pub removed: u64,
}
