//! Search → crawl pipeline behind the HTTP API
//!
//! Every component is constructed once by the caller and injected here;
//! the service holds no global state of its own.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::errors::ServiceError;
use super::types::{
    CacheEntryRequest, ClearCacheResponse, CrawlRequest, CrawlResponse, HealthResponse,
    SearchRequest,
};
use crate::cache::{CacheKey, CacheManager, CacheStats, CacheStatus};
use crate::config::{ConfigSummary, ServiceConfig};
use crate::crawl_engine::{CrawlOptions, CrawlOrchestrator};
use crate::utils::is_valid_url;
use crate::web_search::{
    MAX_RESULTS, SearchBackend, SearchParams, SearchResults, validate_query,
};

/// Values used when a search request leaves them out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDefaults {
    pub limit: usize,
    pub enabled_engines: String,
    pub disabled_engines: String,
}

impl SearchDefaults {
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            limit: config.default_search_limit(),
            enabled_engines: config.enabled_engines().to_string(),
            disabled_engines: config.disabled_engines().to_string(),
        }
    }
}

pub struct SearchCrawlService {
    search: Arc<dyn SearchBackend>,
    orchestrator: Arc<CrawlOrchestrator>,
    defaults: SearchDefaults,
    summary: ConfigSummary,
}

impl SearchCrawlService {
    pub fn new(
        search: Arc<dyn SearchBackend>,
        orchestrator: Arc<CrawlOrchestrator>,
        defaults: SearchDefaults,
        summary: ConfigSummary,
    ) -> Self {
        Self {
            search,
            orchestrator,
            defaults,
            summary,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Arc<CrawlOrchestrator> {
        &self.orchestrator
    }

    fn cache(&self) -> &CacheManager {
        self.orchestrator.cache()
    }

    /// Search, then crawl every result URL with the query as instruction
    pub async fn search_and_crawl(&self, request: SearchRequest) -> Result<CrawlResponse, ServiceError> {
        let query = validate_query(&request.query)?.to_string();
        let limit = request.limit.unwrap_or(self.defaults.limit);
        if limit == 0 || limit > MAX_RESULTS {
            return Err(ServiceError::BadRequest(format!(
                "limit must be between 1 and {MAX_RESULTS}"
            )));
        }
        let params = SearchParams {
            query,
            limit,
            enabled_engines: request
                .enabled_engines
                .unwrap_or_else(|| self.defaults.enabled_engines.clone()),
            disabled_engines: request
                .disabled_engines
                .unwrap_or_else(|| self.defaults.disabled_engines.clone()),
        };

        let found = self.resolve_search(&params, request.bypass_cache).await?;
        let urls = found.urls();
        info!(query = %params.query, urls = urls.len(), "Crawling search results");

        let options = CrawlOptions {
            bypass_cache: request.bypass_cache,
        };
        let batch = self.orchestrator.crawl(&urls, &params.query, options).await;
        if batch.is_pool_exhausted() {
            return Err(ServiceError::PoolExhausted);
        }
        Ok(CrawlResponse::from_batch(batch, Some(params.query)))
    }

    /// Search results from the short-lived search cache, or the backend
    async fn resolve_search(
        &self,
        params: &SearchParams,
        bypass_cache: bool,
    ) -> Result<SearchResults, ServiceError> {
        let key = CacheKey::for_search(
            &params.query,
            params.limit,
            &params.enabled_engines,
            &params.disabled_engines,
        );
        if !bypass_cache
            && let Some(cached) = self.cache().get_search::<SearchResults>(&key).await
        {
            debug!(query = %params.query, "Using cached search results");
            return Ok(cached);
        }

        let found = self.search.search(params).await?;
        if !self.cache().put_search(&key, &params.query, &found).await {
            debug!(query = %params.query, "Search results not cached");
        }
        Ok(found)
    }

    /// Crawl an explicit URL list
    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResponse, ServiceError> {
        let urls: Vec<&str> = request
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(ServiceError::BadRequest("urls must not be empty".into()));
        }
        let invalid: Vec<&str> = urls.iter().copied().filter(|u| !is_valid_url(u)).collect();
        if !invalid.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "only http(s) URLs can be crawled: {}",
                invalid.join(", ")
            )));
        }

        let options = CrawlOptions {
            bypass_cache: request.bypass_cache,
        };
        let batch = self
            .orchestrator
            .crawl(&urls, &request.instruction, options)
            .await;
        if batch.is_pool_exhausted() {
            return Err(ServiceError::PoolExhausted);
        }
        Ok(CrawlResponse::from_batch(batch, None))
    }

    pub async fn health(&self) -> HealthResponse {
        let pool = self.orchestrator.pool().stats();
        let cache = self.cache().status().await;
        let degraded = pool.shutting_down || pool.capacity == 0 || cache == CacheStatus::Unavailable;
        HealthResponse {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            pool,
            cache,
            search_backend: self.search.name().to_string(),
            fetch_backend: self.orchestrator.pool().backend_kind().to_string(),
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache().stats().await
    }

    /// Remove every crawl entry
    pub async fn clear_cache(&self) -> Result<ClearCacheResponse, ServiceError> {
        let removed = self.cache().clear(None).await?;
        Ok(ClearCacheResponse { removed })
    }

    /// Remove the entry for one (URL, instruction) pair
    pub async fn clear_entry(&self, request: CacheEntryRequest) -> Result<ClearCacheResponse, ServiceError> {
        if request.url.trim().is_empty() {
            return Err(ServiceError::BadRequest("url must not be empty".into()));
        }
        let key = CacheManager::compute_key(&request.url, &request.instruction);
        let removed = self.cache().clear(Some(&key)).await?;
        if removed == 0 {
            warn!(url = %request.url, "No cache entry to remove");
        }
        Ok(ClearCacheResponse { removed })
    }

    #[must_use]
    pub fn config_summary(&self) -> &ConfigSummary {
        &self.summary
    }
}
