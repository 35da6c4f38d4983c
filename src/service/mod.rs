//! HTTP service: the search → crawl pipeline and its routes

pub mod errors;
pub mod pipeline;
pub mod router;
pub mod types;

pub use errors::{ErrorResponse, RETRY_AFTER_SECS, ServiceError};
pub use pipeline::{SearchCrawlService, SearchDefaults};
pub use router::router;
pub use types::{
    CacheEntryRequest, ClearCacheResponse, ContentItem, CrawlRequest, CrawlResponse,
    HealthResponse, SearchRequest,
};
