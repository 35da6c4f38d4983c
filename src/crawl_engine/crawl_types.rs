//! Core types for batch crawling.
//!
//! A batch turns a list of [`CrawlTask`]s into one [`CrawlOutcome`] per task
//! and finally into a [`BatchResult`] ordered like the input.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::utils::constants::CONTENT_SEPARATOR;
use crate::worker_pool::FetchError;

/// One URL to crawl under one extraction instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub instruction: String,
}

impl CrawlTask {
    #[must_use]
    pub fn new(url: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            instruction: instruction.into(),
        }
    }

    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_crawl(&self.url, &self.instruction)
    }
}

/// Why a URL produced no content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The fetch ran past its per-fetch timeout
    Timeout,
    /// Navigation, extraction or upstream failure
    Fault(String),
    /// Extracted text was shorter than the minimum word count
    LowQuality { words: usize, required: usize },
    /// No worker became free within the acquire timeout
    PoolExhausted,
    /// The batch deadline passed, or the pool shut down, before the fetch finished
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "fetch timed out"),
            Self::Fault(msg) => write!(f, "fetch failed: {msg}"),
            Self::LowQuality { words, required } => {
                write!(f, "content too short: {words} words, {required} required")
            }
            Self::PoolExhausted => write!(f, "no worker available"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<&FetchError> for FailureReason {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Timeout(_) => Self::Timeout,
            other => Self::Fault(other.to_string()),
        }
    }
}

/// Result for a single task. Exactly one per de-duplicated input URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Hit(String),
    Fetched(String),
    Failed(FailureReason),
}

/// Content for one URL, as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledContent {
    pub reference: String,
    pub content: String,
    pub from_cache: bool,
}

/// A URL that produced no content, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFailure {
    pub url: String,
    pub reason: FailureReason,
}

/// Terminal artifact of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Hits and fresh successes, in input URL order
    pub ordered_contents: Vec<CrawledContent>,
    /// Failed URLs, in input URL order
    pub failures: Vec<UrlFailure>,
    pub cache_hits: usize,
    pub newly_crawled: usize,
}

impl BatchResult {
    #[must_use]
    pub fn failed_urls(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.url.clone()).collect()
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.ordered_contents.len()
    }

    /// Every URL needed a worker and none could be had.
    ///
    /// Only true when there is nothing at all to return; a batch with any
    /// hit or success is a partial success instead.
    #[must_use]
    pub fn is_pool_exhausted(&self) -> bool {
        self.ordered_contents.is_empty()
            && !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|f| f.reason == FailureReason::PoolExhausted)
    }

    /// All contents joined with the separator, in URL order
    #[must_use]
    pub fn combined_content(&self) -> String {
        self.ordered_contents
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTENT_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(url: &str, text: &str) -> CrawledContent {
        CrawledContent {
            reference: url.into(),
            content: text.into(),
            from_cache: false,
        }
    }

    #[test]
    fn combined_content_uses_separator() {
        let result = BatchResult {
            ordered_contents: vec![content("a", "first"), content("b", "second")],
            ..BatchResult::default()
        };
        assert_eq!(result.combined_content(), "first\n\n==========\n\nsecond");
    }

    #[test]
    fn exhaustion_needs_an_empty_result() {
        let exhausted = UrlFailure {
            url: "https://a.example/".into(),
            reason: FailureReason::PoolExhausted,
        };
        let mut result = BatchResult {
            failures: vec![exhausted.clone()],
            ..BatchResult::default()
        };
        assert!(result.is_pool_exhausted());

        result.ordered_contents.push(content("https://b.example/", "hit"));
        assert!(!result.is_pool_exhausted());
        assert!(!BatchResult::default().is_pool_exhausted());
    }

    #[test]
    fn failure_reason_serializes_tagged() {
        let json = serde_json::to_value(FailureReason::LowQuality {
            words: 5,
            required: 10,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "low_quality", "detail": {"words": 5, "required": 10}})
        );
        assert_eq!(
            serde_json::to_value(FailureReason::Timeout).unwrap(),
            serde_json::json!({"kind": "timeout"})
        );
    }

    #[test]
    fn timeout_fetch_error_maps_to_timeout() {
        let err = FetchError::Timeout(std::time::Duration::from_secs(3));
        assert_eq!(FailureReason::from(&err), FailureReason::Timeout);
        let err = FetchError::EmptyContent;
        assert!(matches!(FailureReason::from(&err), FailureReason::Fault(_)));
    }
}
