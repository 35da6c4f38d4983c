//! Page content pipeline
//!
//! Rendered HTML goes through four stages before it is handed back as a
//! fetch result: primary-container selection, markdown conversion with the
//! chrome tags stripped, block pruning, and markdown → plain text.

pub mod extract;
pub mod plaintext;
pub mod prune;

pub use extract::{SKIPPED_TAGS, html_to_markdown, main_content_html};
pub use plaintext::{markdown_to_text, word_count};
pub use prune::prune_markdown;

use crate::worker_pool::FetchError;

/// Thresholds applied to every page a worker extracts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentPipeline {
    /// Minimum words for a markdown block to survive pruning
    pub word_count_threshold: usize,
    /// Minimum text density for a markdown block to survive pruning
    pub filter_threshold: f64,
}

impl ContentPipeline {
    #[must_use]
    pub fn new(word_count_threshold: usize, filter_threshold: f64) -> Self {
        Self {
            word_count_threshold,
            filter_threshold,
        }
    }

    #[must_use]
    pub fn from_config(config: &crate::config::ServiceConfig) -> Self {
        Self::new(config.word_count_threshold(), config.content_filter_threshold())
    }

    /// Full HTML → plain text extraction
    pub fn process_html(&self, html: &str) -> Result<String, FetchError> {
        let container = main_content_html(html);
        let markdown = html_to_markdown(&container)
            .map_err(|e| FetchError::Extraction(format!("markdown conversion failed: {e}")))?;
        Ok(self.process_markdown(&markdown))
    }

    /// Pruning and plain-text conversion for markdown that is already
    /// extracted (reader responses)
    #[must_use]
    pub fn process_markdown(&self, markdown: &str) -> String {
        let pruned = prune_markdown(markdown, self.word_count_threshold, self.filter_threshold);
        markdown_to_text(&pruned)
    }
}
