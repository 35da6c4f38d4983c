//! Getter methods for `ServiceConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `ServiceConfig` instance.

use std::time::Duration;

use crate::fetcher::FetchBackendKind;

use super::types::{
    ApiSummary, CacheSummary, ConfigSummary, CrawlerSummary, EngineSummary, SearxngSummary,
    ServiceConfig,
};

impl ServiceConfig {
    #[must_use]
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    #[must_use]
    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    #[must_use]
    pub fn searxng_host(&self) -> &str {
        &self.searxng_host
    }

    #[must_use]
    pub fn searxng_port(&self) -> u16 {
        self.searxng_port
    }

    #[must_use]
    pub fn searxng_base_path(&self) -> &str {
        &self.searxng_base_path
    }

    /// Full SearXNG search endpoint, e.g. `http://localhost:8080/search`
    #[must_use]
    pub fn searxng_api_base(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.searxng_host, self.searxng_port, self.searxng_base_path
        )
    }

    #[must_use]
    pub fn search_language(&self) -> &str {
        &self.search_language
    }

    #[must_use]
    pub fn default_search_limit(&self) -> usize {
        self.default_search_limit
    }

    #[must_use]
    pub fn enabled_engines(&self) -> &str {
        &self.enabled_engines
    }

    #[must_use]
    pub fn disabled_engines(&self) -> &str {
        &self.disabled_engines
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    #[must_use]
    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    #[must_use]
    pub fn cache_ttl_hours(&self) -> u64 {
        self.cache_ttl_hours
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    #[must_use]
    pub fn search_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.search_cache_ttl_secs)
    }

    #[must_use]
    pub fn cache_recheck_interval(&self) -> Duration {
        Duration::from_secs(self.cache_recheck_secs)
    }

    /// Ceiling on one cache store call
    #[must_use]
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[must_use]
    pub fn pool_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_acquire_timeout_secs)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    #[must_use]
    pub fn fetch_retries(&self) -> u8 {
        self.fetch_retries
    }

    #[must_use]
    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_secs)
    }

    #[must_use]
    pub fn content_filter_threshold(&self) -> f64 {
        self.content_filter_threshold
    }

    #[must_use]
    pub fn word_count_threshold(&self) -> usize {
        self.word_count_threshold
    }

    #[must_use]
    pub fn min_word_count(&self) -> usize {
        self.min_word_count
    }

    #[must_use]
    pub fn fetch_backend(&self) -> FetchBackendKind {
        self.fetch_backend
    }

    #[must_use]
    pub fn reader_url(&self) -> &str {
        &self.reader_url
    }

    #[must_use]
    pub fn reader_api_key(&self) -> Option<&str> {
        self.reader_api_key.as_deref()
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Secret-free snapshot served by `GET /config`
    #[must_use]
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            searxng: SearxngSummary {
                host: self.searxng_host.clone(),
                port: self.searxng_port,
                base_path: self.searxng_base_path.clone(),
                api_base: self.searxng_api_base(),
            },
            api: ApiSummary {
                host: self.api_host.clone(),
                port: self.api_port,
            },
            crawler: CrawlerSummary {
                default_search_limit: self.default_search_limit,
                content_filter_threshold: self.content_filter_threshold,
                word_count_threshold: self.word_count_threshold,
                min_word_count: self.min_word_count,
                pool_size: self.pool_size,
                fetch_timeout_secs: self.fetch_timeout_secs,
                batch_timeout_secs: self.batch_timeout_secs,
                fetch_backend: self.fetch_backend,
            },
            cache: CacheSummary {
                enabled: self.cache_enabled,
                ttl_hours: self.cache_ttl_hours,
                search_ttl_secs: self.search_cache_ttl_secs,
            },
            search_engines: EngineSummary {
                enabled: self.enabled_engines.clone(),
                disabled: self.disabled_engines.clone(),
            },
        }
    }
}
