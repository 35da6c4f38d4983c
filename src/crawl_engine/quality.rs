//! Minimum-content gate applied to freshly fetched text

use log::debug;

use super::crawl_types::FailureReason;
use crate::content::word_count;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    min_words: usize,
}

impl QualityGate {
    #[must_use]
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    #[must_use]
    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Word count of `text`, or `LowQuality` below the minimum
    pub fn check(&self, url: &str, text: &str) -> Result<usize, FailureReason> {
        let words = word_count(text);
        if words < self.min_words {
            debug!("Rejecting {}: {} words, {} required", url, words, self.min_words);
            return Err(FailureReason::LowQuality {
                words,
                required: self.min_words,
            });
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_below_minimum() {
        let gate = QualityGate::new(10);
        assert_eq!(
            gate.check("u", "only five words right here"),
            Err(FailureReason::LowQuality {
                words: 5,
                required: 10
            })
        );
        assert_eq!(gate.check("u", &"word ".repeat(10)), Ok(10));
    }

    #[test]
    fn zero_minimum_accepts_anything() {
        assert_eq!(QualityGate::new(0).check("u", ""), Ok(0));
    }
}
