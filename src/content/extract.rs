//! HTML → markdown for the primary content of a page

use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Elements dropped wholesale during conversion
pub const SKIPPED_TAGS: &[&str] = &[
    "img", "header", "footer", "iframe", "nav", "script", "style", "noscript", "aside", "svg",
    "form",
];

/// Pages larger than this are cut before parsing
const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

static MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("main").expect("BUG: hardcoded CSS selector 'main' is invalid")
});

static ARTICLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article").expect("BUG: hardcoded CSS selector 'article' is invalid")
});

static ROLE_MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[role='main']")
        .expect("BUG: hardcoded CSS selector '[role=main]' is invalid")
});

static CONTENT_ID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#content").expect("BUG: hardcoded CSS selector '#content' is invalid")
});

static ENTRY_CONTENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".entry-content, .post-content, .article-body")
        .expect("BUG: hardcoded CSS selector list for post bodies is invalid")
});

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("BUG: hardcoded CSS selector 'body' is invalid")
});

/// Outer HTML of the most specific content container, falling back to
/// `<body>` and then the input itself.
#[must_use]
pub fn main_content_html(html: &str) -> String {
    let html = crate::utils::string_utils::safe_truncate_bytes(html, MAX_HTML_SIZE);
    let document = Html::parse_document(html);

    let containers = [
        &*MAIN_SELECTOR,
        &*ARTICLE_SELECTOR,
        &*ROLE_MAIN_SELECTOR,
        &*CONTENT_ID_SELECTOR,
        &*ENTRY_CONTENT_SELECTOR,
        &*BODY_SELECTOR,
    ];
    containers
        .into_iter()
        .find_map(|selector| document.select(selector).next())
        .map_or_else(|| html.to_string(), |element| element.html())
}

/// Convert HTML to markdown with the non-content tags stripped
pub fn html_to_markdown(html: &str) -> std::io::Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    converter.convert(html)
}
