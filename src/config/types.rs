//! Core configuration types for the search-and-crawl service
//!
//! `ServiceConfig` is built once at startup (from the environment or the
//! builder) and handed to every component constructor. Nothing reads the
//! environment after that point.

use serde::{Deserialize, Serialize};

use crate::fetcher::FetchBackendKind;

/// Main configuration struct for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub(crate) api_host: String,
    pub(crate) api_port: u16,

    pub(crate) searxng_host: String,
    pub(crate) searxng_port: u16,
    pub(crate) searxng_base_path: String,
    pub(crate) search_language: String,
    pub(crate) default_search_limit: usize,
    /// Comma-separated SearXNG engine list, `name__category` format
    pub(crate) enabled_engines: String,
    pub(crate) disabled_engines: String,

    /// Master switch for the shared content cache
    pub(crate) cache_enabled: bool,

    /// Redis connection string.
    ///
    /// May carry credentials, so it is never part of [`ConfigSummary`].
    #[serde(skip_serializing)]
    pub(crate) redis_url: String,

    /// Crawl entry lifetime in hours
    pub(crate) cache_ttl_hours: u64,

    /// Search result lifetime in seconds
    pub(crate) search_cache_ttl_secs: u64,

    /// Seconds the cache manager waits before re-probing an unreachable store
    pub(crate) cache_recheck_secs: u64,

    /// Milliseconds a single cache store call may take before the store counts as unreachable
    pub(crate) cache_timeout_ms: u64,

    /// Number of long-lived fetch workers.
    /// Default: 4, Range: 1-64
    pub(crate) pool_size: usize,

    /// Seconds a fetch task waits for a worker before reporting pool exhaustion
    pub(crate) pool_acquire_timeout_secs: u64,

    /// Per-URL fetch timeout in seconds (navigation + extraction)
    pub(crate) fetch_timeout_secs: u64,

    /// Whole-batch timeout in seconds.
    ///
    /// **INVARIANT:** strictly greater than `fetch_timeout_secs` (checked in `validate`).
    pub(crate) batch_timeout_secs: u64,

    /// Re-attempts for timeouts and navigation faults
    pub(crate) fetch_retries: u8,

    /// Seconds shutdown waits for in-flight fetches to finish
    pub(crate) shutdown_drain_secs: u64,

    /// Minimum text density (0.0-1.0) for a markdown block to survive pruning
    pub(crate) content_filter_threshold: f64,

    /// Minimum words for a markdown block to survive pruning
    pub(crate) word_count_threshold: usize,

    /// Minimum words for a whole document to be accepted
    pub(crate) min_word_count: usize,

    pub(crate) fetch_backend: FetchBackendKind,
    pub(crate) reader_url: String,

    #[serde(skip_serializing)]
    pub(crate) reader_api_key: Option<String>,

    pub(crate) headless: bool,

    /// Default tracing filter when `RUST_LOG` is not set
    pub(crate) log_level: String,
}

/// Secret-free view of the configuration for the `/config` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSummary {
    pub searxng: SearxngSummary,
    pub api: ApiSummary,
    pub crawler: CrawlerSummary,
    pub cache: CacheSummary,
    pub search_engines: EngineSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearxngSummary {
    pub host: String,
    pub port: u16,
    pub base_path: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSummary {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlerSummary {
    pub default_search_limit: usize,
    pub content_filter_threshold: f64,
    pub word_count_threshold: usize,
    pub min_word_count: usize,
    pub pool_size: usize,
    pub fetch_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub fetch_backend: FetchBackendKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSummary {
    pub enabled: bool,
    pub ttl_hours: u64,
    pub search_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSummary {
    pub enabled: String,
    pub disabled: String,
}

/// Errors produced while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape
    #[error("invalid value {value:?} for {key}: {reason}")]
    Parse {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Values parsed but do not make sense together
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
