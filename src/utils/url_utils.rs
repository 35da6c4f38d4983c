//! URL helpers shared by the cache and the orchestrator.
//!
//! Cache keys and batch de-duplication both need one canonical spelling of
//! a URL, so normalization lives here instead of in either caller.

use std::collections::HashSet;
use url::Url;

/// Canonical form of a URL for keying and de-duplication.
///
/// Scheme and host are lowercased by the parser, default ports are dropped,
/// and the fragment is removed (it never reaches the server). Path and query
/// are kept verbatim. Input that does not parse is returned trimmed.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
        }
        Err(_) => false,
    }
}

/// Remove repeated URLs, keeping the first occurrence and the input order.
///
/// Two spellings that normalize to the same URL count as repeats; the
/// spelling of the first one is what the caller gets back.
#[must_use]
pub fn dedup_urls<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.iter()
        .map(AsRef::as_ref)
        .filter(|url| !url.trim().is_empty())
        .filter(|url| seen.insert(normalize_url(url)))
        .map(|url| url.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_fragment_and_default_port() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM:443/Docs?q=1#intro"),
            "https://example.com/Docs?q=1"
        );
    }

    #[test]
    fn normalize_keeps_unparsable_input() {
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let urls = [
            "https://b.example/",
            "https://a.example/",
            "https://b.example/#top",
            "https://c.example/",
            "https://a.example/",
        ];
        assert_eq!(
            dedup_urls(&urls),
            vec!["https://b.example/", "https://a.example/", "https://c.example/"]
        );
    }

    #[test]
    fn dedup_skips_blank_entries() {
        let urls = ["", "   ", "https://a.example/"];
        assert_eq!(dedup_urls(&urls), vec!["https://a.example/"]);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("mailto:someone@example.com"));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url(""));
    }
}
