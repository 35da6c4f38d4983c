//! Fluent builder for `ServiceConfig`
//!
//! Every field has a default, so unlike a typestate builder there is no
//! required-field ordering; `build()` runs validation instead.

use crate::fetcher::FetchBackendKind;
use crate::utils::{
    DEFAULT_API_HOST, DEFAULT_API_PORT, DEFAULT_BATCH_TIMEOUT_SECS, DEFAULT_CACHE_RECHECK_SECS,
    DEFAULT_CACHE_TIMEOUT_MS,
    DEFAULT_CACHE_TTL_HOURS, DEFAULT_CONTENT_FILTER_THRESHOLD, DEFAULT_DISABLED_ENGINES,
    DEFAULT_ENABLED_ENGINES, DEFAULT_FETCH_RETRIES, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MIN_WORD_COUNT, DEFAULT_POOL_ACQUIRE_TIMEOUT_SECS, DEFAULT_POOL_SIZE,
    DEFAULT_READER_URL, DEFAULT_REDIS_URL, DEFAULT_SEARCH_CACHE_TTL_SECS, DEFAULT_SEARCH_LANGUAGE,
    DEFAULT_SEARCH_LIMIT, DEFAULT_SEARXNG_BASE_PATH, DEFAULT_SEARXNG_HOST, DEFAULT_SEARXNG_PORT,
    DEFAULT_SHUTDOWN_DRAIN_SECS, DEFAULT_WORD_COUNT_THRESHOLD, MAX_POOL_SIZE,
};

use super::types::{ConfigError, ServiceConfig};

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            searxng_host: DEFAULT_SEARXNG_HOST.to_string(),
            searxng_port: DEFAULT_SEARXNG_PORT,
            searxng_base_path: DEFAULT_SEARXNG_BASE_PATH.to_string(),
            search_language: DEFAULT_SEARCH_LANGUAGE.to_string(),
            default_search_limit: DEFAULT_SEARCH_LIMIT,
            enabled_engines: DEFAULT_ENABLED_ENGINES.to_string(),
            disabled_engines: DEFAULT_DISABLED_ENGINES.to_string(),
            cache_enabled: true,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            search_cache_ttl_secs: DEFAULT_SEARCH_CACHE_TTL_SECS,
            cache_recheck_secs: DEFAULT_CACHE_RECHECK_SECS,
            cache_timeout_ms: DEFAULT_CACHE_TIMEOUT_MS,
            pool_size: DEFAULT_POOL_SIZE,
            pool_acquire_timeout_secs: DEFAULT_POOL_ACQUIRE_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            shutdown_drain_secs: DEFAULT_SHUTDOWN_DRAIN_SECS,
            content_filter_threshold: DEFAULT_CONTENT_FILTER_THRESHOLD,
            word_count_threshold: DEFAULT_WORD_COUNT_THRESHOLD,
            min_word_count: DEFAULT_MIN_WORD_COUNT,
            fetch_backend: FetchBackendKind::Browser,
            reader_url: DEFAULT_READER_URL.to_string(),
            reader_api_key: None,
            headless: true,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Create a builder for configuring a `ServiceConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::Invalid(format!(
                "pool_size must be between 1 and {MAX_POOL_SIZE}, got {}",
                self.pool_size
            )));
        }
        if self.fetch_timeout_secs == 0 || self.pool_acquire_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch and acquire timeouts must be greater than 0".into(),
            ));
        }
        if self.batch_timeout_secs <= self.fetch_timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "batch_timeout_secs ({}) must be greater than fetch_timeout_secs ({})",
                self.batch_timeout_secs, self.fetch_timeout_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.content_filter_threshold) {
            return Err(ConfigError::Invalid(format!(
                "content_filter_threshold must be within 0.0..=1.0, got {}",
                self.content_filter_threshold
            )));
        }
        if self.default_search_limit == 0 {
            return Err(ConfigError::Invalid(
                "default_search_limit must be greater than 0".into(),
            ));
        }
        if self.cache_enabled && self.cache_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache_timeout_ms must be greater than 0 when the cache is enabled".into(),
            ));
        }
        if self.cache_enabled && self.cache_ttl_hours == 0 {
            return Err(ConfigError::Invalid(
                "cache_ttl_hours must be greater than 0 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.config.api_host = host.into();
        self
    }

    #[must_use]
    pub fn api_port(mut self, port: u16) -> Self {
        self.config.api_port = port;
        self
    }

    #[must_use]
    pub fn searxng(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.searxng_host = host.into();
        self.config.searxng_port = port;
        self
    }

    #[must_use]
    pub fn searxng_base_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        // Normalize: the client appends the path to `http://host:port`
        self.config.searxng_base_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    #[must_use]
    pub fn search_language(mut self, language: impl Into<String>) -> Self {
        self.config.search_language = language.into();
        self
    }

    #[must_use]
    pub fn default_search_limit(mut self, limit: usize) -> Self {
        self.config.default_search_limit = limit;
        self
    }

    #[must_use]
    pub fn engines(mut self, enabled: impl Into<String>, disabled: impl Into<String>) -> Self {
        self.config.enabled_engines = enabled.into();
        self.config.disabled_engines = disabled.into();
        self
    }

    #[must_use]
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn cache_ttl_hours(mut self, hours: u64) -> Self {
        self.config.cache_ttl_hours = hours;
        self
    }

    #[must_use]
    pub fn search_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.search_cache_ttl_secs = secs;
        self
    }

    #[must_use]
    pub fn cache_recheck_secs(mut self, secs: u64) -> Self {
        self.config.cache_recheck_secs = secs;
        self
    }

    #[must_use]
    pub fn cache_timeout_ms(mut self, millis: u64) -> Self {
        self.config.cache_timeout_ms = millis;
        self
    }

    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    #[must_use]
    pub fn pool_acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pool_acquire_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn batch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.batch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn fetch_retries(mut self, retries: u8) -> Self {
        self.config.fetch_retries = retries;
        self
    }

    #[must_use]
    pub fn shutdown_drain_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_drain_secs = secs;
        self
    }

    #[must_use]
    pub fn content_filter_threshold(mut self, threshold: f64) -> Self {
        self.config.content_filter_threshold = threshold;
        self
    }

    #[must_use]
    pub fn word_count_threshold(mut self, words: usize) -> Self {
        self.config.word_count_threshold = words;
        self
    }

    #[must_use]
    pub fn min_word_count(mut self, words: usize) -> Self {
        self.config.min_word_count = words;
        self
    }

    #[must_use]
    pub fn fetch_backend(mut self, backend: FetchBackendKind) -> Self {
        self.config.fetch_backend = backend;
        self
    }

    #[must_use]
    pub fn reader(mut self, url: impl Into<String>, api_key: Option<String>) -> Self {
        self.config.reader_url = url.into();
        self.config.reader_api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let mut config = self.config;

        // Enforce headless mode in release builds for production safety
        #[cfg(not(debug_assertions))]
        if !config.headless {
            tracing::warn!(
                "Forcing headless mode in release build. \
                Headed mode is only available in debug builds for development."
            );
            config.headless = true;
        }

        config.reader_url = config.reader_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }
}
