//! Deterministic cache keys.
//!
//! Keys are `prefix + hex(sha256(fields))`. Every field is length-prefixed
//! before hashing, so `("ab", "c")` and `("a", "bc")` never collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::normalize_url;

/// Namespace for extracted page content
pub const CRAWL_KEY_PREFIX: &str = "crawl_cache:";

/// Namespace for search collaborator results
pub const SEARCH_KEY_PREFIX: &str = "search_cache:";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for the content of `url` extracted under `instruction`.
    ///
    /// The URL is normalized first, so `https://A.com/x#top` and
    /// `https://a.com/x` share an entry.
    #[must_use]
    pub fn for_crawl(url: &str, instruction: &str) -> Self {
        let normalized = normalize_url(url);
        Self::digest(CRAWL_KEY_PREFIX, &[normalized.as_str(), instruction])
    }

    /// Key for a search result list.
    ///
    /// Engine lists are part of the key: the same query against a different
    /// engine set is a different result.
    #[must_use]
    pub fn for_search(query: &str, limit: usize, enabled: &str, disabled: &str) -> Self {
        let limit = limit.to_string();
        Self::digest(
            SEARCH_KEY_PREFIX,
            &[query.trim(), limit.as_str(), enabled, disabled],
        )
    }

    fn digest(prefix: &str, fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        Self(format!("{prefix}{}", hex::encode(hasher.finalize())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn crawl_key_has_prefix_and_fixed_length() {
        let key = CacheKey::for_crawl("https://example.com/", "");
        assert!(key.as_str().starts_with(CRAWL_KEY_PREFIX));
        assert_eq!(key.as_str().len(), CRAWL_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn fragment_does_not_change_key() {
        assert_eq!(
            CacheKey::for_crawl("https://Example.com/page#a", "summarize"),
            CacheKey::for_crawl("https://example.com/page", "summarize"),
        );
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        assert_ne!(
            CacheKey::for_crawl("https://a.example/ab", "c"),
            CacheKey::for_crawl("https://a.example/a", "bc"),
        );
    }

    #[test]
    fn search_key_depends_on_engines() {
        let a = CacheKey::for_search("rust", 10, "baidu__general", "");
        let b = CacheKey::for_search("rust", 10, "", "baidu__general");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(SEARCH_KEY_PREFIX));
    }

    proptest! {
        #[test]
        fn crawl_key_is_pure(url in "https://[a-z]{1,12}\\.example/[a-z0-9/]{0,24}", instr in ".{0,40}") {
            prop_assert_eq!(
                CacheKey::for_crawl(&url, &instr),
                CacheKey::for_crawl(&url, &instr)
            );
        }

        #[test]
        fn instruction_changes_key(
            url in "https://[a-z]{1,12}\\.example/[a-z0-9]{0,16}",
            a in "[a-z ]{0,20}",
            b in "[a-z ]{0,20}",
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(CacheKey::for_crawl(&url, &a), CacheKey::for_crawl(&url, &b));
        }
    }
}
