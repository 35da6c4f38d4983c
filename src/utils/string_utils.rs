//! UTF-8-safe string truncation
//!
//! Log lines and error messages quote page text and upstream response
//! bodies; slicing those by byte index panics on multi-byte characters.

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Respects UTF-8 character boundaries and never panics.
///
/// # Examples
/// ```
/// # use searcrawl::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("🎉🎊🎈", 2), "🎉🎊");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Truncate to at most `max_bytes`, backing off to the previous char boundary.
#[must_use]
pub fn safe_truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Short single-line preview of a longer text for log output.
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = safe_truncate_chars(&flat, max_chars);
    if cut.len() < flat.len() {
        format!("{cut}…")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let text = "┌───┐ box";
        assert_eq!(safe_truncate_chars(text, 5), "┌───┐");
    }

    #[test]
    fn byte_truncation_backs_off_to_boundary() {
        // 'é' is two bytes
        assert_eq!(safe_truncate_bytes("café", 4), "caf");
        assert_eq!(safe_truncate_bytes("café", 5), "café");
    }

    #[test]
    fn preview_flattens_whitespace() {
        assert_eq!(preview("a\n\n  b\tc", 10), "a b c");
        assert_eq!(preview("one two three", 7), "one two…");
    }
}
