//! Crawl Engine Module
//!
//! Batch crawling over the shared worker pool and content cache. The
//! orchestrator is the only entry point; the other modules are its parts.

pub mod crawl_types;
pub mod fetch_timeout;
pub mod orchestrator;
pub mod quality;

pub use crawl_types::{
    BatchResult, CrawlOutcome, CrawlTask, CrawledContent, FailureReason, UrlFailure,
};
pub use fetch_timeout::with_fetch_timeout;
pub use orchestrator::{CrawlOptions, CrawlOrchestrator, OrchestratorSettings};
pub use quality::QualityGate;
