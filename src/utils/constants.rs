//! Shared configuration constants for searcrawl
//!
//! Default values used by the config layer and the components it builds.
//! Keeping them here avoids magic numbers drifting apart between the
//! environment loader, the builder, and the tests.

/// Default HTTP bind host for the API server
pub const DEFAULT_API_HOST: &str = "0.0.0.0";

/// Default HTTP port for the API server
pub const DEFAULT_API_PORT: u16 = 3000;

/// Default SearXNG host
pub const DEFAULT_SEARXNG_HOST: &str = "localhost";

/// Default SearXNG port
pub const DEFAULT_SEARXNG_PORT: u16 = 8080;

/// Default SearXNG search endpoint path
pub const DEFAULT_SEARXNG_BASE_PATH: &str = "/search";

/// Default search language passed to SearXNG
pub const DEFAULT_SEARCH_LANGUAGE: &str = "auto";

/// Default number of search results to crawl per query
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Engines disabled unless the request overrides them.
///
/// Comma-separated list in SearXNG's `name__category` cookie format.
pub const DEFAULT_DISABLED_ENGINES: &str = "wikipedia__general,currency__general,wikidata__general,\
duckduckgo__general,google__general,lingva__general,qwant__general,startpage__general,\
dictzone__general,mymemory translated__general,brave__general";

/// Engines enabled unless the request overrides them
pub const DEFAULT_ENABLED_ENGINES: &str = "baidu__general";

/// Default Redis connection string for the shared cache store
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Crawl cache entry lifetime: 24 hours
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Search result cache lifetime: 5 minutes
///
/// Search rankings change quickly; this only absorbs bursts of identical
/// queries (retries, several clients asking the same thing).
pub const DEFAULT_SEARCH_CACHE_TTL_SECS: u64 = 300;

/// How long the cache manager stays in disabled mode before probing the store again
pub const DEFAULT_CACHE_RECHECK_SECS: u64 = 30;

/// Ceiling on a single cache store call, in milliseconds
///
/// A store that stops answering is treated as unreachable once this passes.
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 1000;

/// Number of long-lived fetch workers (browser sessions)
///
/// Each browser session costs roughly 100-200MB of RSS, so the default
/// stays small. Raise it on hosts with memory to spare.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Upper bound accepted for the pool size
pub const MAX_POOL_SIZE: usize = 64;

/// How long a fetch task waits for a free worker before giving up
pub const DEFAULT_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Per-URL fetch timeout (navigation + extraction)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Whole-batch timeout; must be strictly longer than the per-fetch timeout
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 120;

/// Re-attempts for a retryable fetch failure (timeouts, navigation faults)
pub const DEFAULT_FETCH_RETRIES: u8 = 1;

/// How long shutdown waits for in-flight fetches before closing sessions anyway
pub const DEFAULT_SHUTDOWN_DRAIN_SECS: u64 = 30;

/// Minimum text density for a markdown block to survive pruning
pub const DEFAULT_CONTENT_FILTER_THRESHOLD: f64 = 0.6;

/// Minimum words for a markdown block to survive pruning
pub const DEFAULT_WORD_COUNT_THRESHOLD: usize = 10;

/// Minimum words for a whole extracted document to count as a success
pub const DEFAULT_MIN_WORD_COUNT: usize = 10;

/// Default reader service used by the `reader` fetch backend
pub const DEFAULT_READER_URL: &str = "https://r.jina.ai";

/// Separator placed between documents in the combined `content` field
pub const CONTENT_SEPARATOR: &str = "\n\n==========\n\n";

/// User agent sent to SearXNG and the reader service
pub const SERVICE_USER_AGENT: &str = concat!("searcrawl/", env!("CARGO_PKG_VERSION"));

/// Chrome user agent string for browser workers
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
