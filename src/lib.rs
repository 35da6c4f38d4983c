pub mod browser_profile;
pub mod browser_setup;
pub mod cache;
pub mod config;
pub mod content;
pub mod crawl_engine;
pub mod fetcher;
pub mod logging;
pub mod service;
pub mod utils;
pub mod web_search;
pub mod worker_pool;

pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use cache::{CacheKey, CacheManager, CacheStore, MemoryStore, RedisStore};
pub use config::{ConfigSummary, ServiceConfig};
pub use crawl_engine::{
    BatchResult, CrawlOptions, CrawlOrchestrator, CrawlOutcome, CrawlTask, FailureReason,
    OrchestratorSettings,
};
pub use fetcher::{FetchBackendKind, build_factory};
pub use service::{SearchCrawlService, SearchDefaults, ServiceError, router};
pub use web_search::{SearchBackend, SearchError, SearchParams, SearchResults, SearxngClient};
pub use worker_pool::{FetchError, PoolError, Worker, WorkerFactory, WorkerGuard, WorkerPool};
