//! Markdown → plain text and word counting

use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```.*?```").expect("CODE_FENCE_RE: hardcoded regex is valid")
});

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Bounded quantifiers keep matching linear on hostile input
    Regex::new(r"!\[[^\]]{0,200}\]\([^\)]{0,2000}\)").expect("IMAGE_RE: hardcoded regex is valid")
});

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]{1,500})\]\([^\)]{1,2000}\)").expect("LINK_RE: hardcoded regex is valid")
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("HEADING_RE: hardcoded regex is valid")
});

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").expect("BOLD_RE: hardcoded regex is valid")
});

static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `_` only at word edges so snake_case identifiers survive
    Regex::new(r"\*([^*\n]+)\*|\b_([^_\n]+)_\b").expect("ITALIC_RE: hardcoded regex is valid")
});

static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]*)`").expect("INLINE_CODE_RE: hardcoded regex is valid"));

static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[*+-]|\d{1,3}\.)[ \t]+").expect("LIST_MARKER_RE: hardcoded regex is valid")
});

static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").expect("QUOTE_RE: hardcoded regex is valid"));

static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*_][ \t]*){3,}$").expect("RULE_RE: hardcoded regex is valid")
});

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("BLANK_RUN_RE: hardcoded regex is valid"));

/// Strip markdown syntax, keeping the readable text.
///
/// Fenced code blocks are dropped entirely; link text is kept without its
/// target; images vanish.
#[must_use]
pub fn markdown_to_text(markdown: &str) -> String {
    let text = CODE_FENCE_RE.replace_all(markdown, "");
    let text = IMAGE_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = RULE_RE.replace_all(&text, "");
    let text = HEADING_RE.replace_all(&text, "");
    let text = BOLD_RE.replace_all(&text, "$1$2");
    let text = ITALIC_RE.replace_all(&text, "$1$2");
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    let text = LIST_MARKER_RE.replace_all(&text, "");
    let text = QUOTE_RE.replace_all(&text, "");

    let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
    BLANK_RUN_RE
        .replace_all(&trimmed.join("\n"), "\n\n")
        .trim()
        .to_string()
}

/// Whitespace-separated words
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_common_syntax() {
        let md = "# Title\n\nSome **bold** and *italic* with a [link](https://x.example/a).\n\n- item one\n- item two\n\n> quoted\n\n`code` here";
        assert_eq!(
            markdown_to_text(md),
            "Title\n\nSome bold and italic with a link.\n\nitem one\nitem two\n\nquoted\n\ncode here"
        );
    }

    #[test]
    fn drops_code_fences_and_images() {
        let md = "Before\n\n```rust\nfn main() {}\n```\n\n![logo](https://x.example/logo.png)After";
        assert_eq!(markdown_to_text(md), "Before\n\nAfter");
    }

    #[test]
    fn keeps_snake_case() {
        assert_eq!(markdown_to_text("call my_func_name now"), "call my_func_name now");
    }

    #[test]
    fn counts_words() {
        assert_eq!(word_count("  one two\nthree\tfour  "), 4);
        assert_eq!(word_count(""), 0);
    }
}
