//! SearXNG client against a mock server

use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use searcrawl::web_search::{SearchError, SearchParams, SearxngClient};

fn client(server: &Server) -> SearxngClient {
    SearxngClient::new(format!("{}/search", server.url()), "en")
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
}

fn params(query: &str, limit: usize) -> SearchParams {
    SearchParams {
        query: query.to_string(),
        limit,
        enabled_engines: "google__general,wikipedia__general".to_string(),
        disabled_engines: "bing__general".to_string(),
    }
}

#[tokio::test]
async fn parses_ranks_and_truncates_results() {
    let mut server = Server::new_async().await;
    let body = json!({
        "query": "rust async",
        "results": [
            {"url": "https://tokio.rs/", "title": "Tokio", "content": "An async runtime"},
            {"title": "no url here", "content": "dropped"},
            {"url": "https://rust-lang.github.io/async-book/", "title": "Async Book"},
            {"url": "https://docs.rs/futures", "title": "futures"}
        ]
    });
    let mock = server
        .mock("POST", "/search")
        .match_header(
            "cookie",
            "disabled_engines=bing__general;enabled_engines=google__general,wikipedia__general;method=POST",
        )
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="q"\r\n\r\nrust async"#.into()),
            Matcher::Regex(r#"name="format"\r\n\r\njson"#.into()),
            Matcher::Regex(r#"name="time_range"\r\n\r\nweek"#.into()),
            Matcher::Regex(r#"name="safesearch"\r\n\r\n2"#.into()),
            Matcher::Regex(r#"name="language"\r\n\r\nen"#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let results = client(&server).search(&params("  rust async ", 2)).await.unwrap();
    mock.assert_async().await;

    assert_eq!(results.query, "rust async");
    assert_eq!(
        results.urls(),
        vec!["https://tokio.rs/", "https://rust-lang.github.io/async-book/"]
    );
    assert_eq!(results.results[0].rank, 1);
    assert_eq!(results.results[0].snippet, "An async runtime");
    assert_eq!(results.results[1].rank, 2);
    assert_eq!(results.results[1].snippet, "");
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .with_status(503)
        .with_body("upstream engines overloaded")
        .expect(3)
        .create_async()
        .await;

    let err = client(&server).search(&params("rust", 5)).await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, SearchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .with_status(403)
        .with_body("forbidden")
        .expect(1)
        .create_async()
        .await;

    let err = client(&server).search(&params("rust", 5)).await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, SearchError::Status { status: 403, .. }));
}

#[tokio::test]
async fn empty_result_list_is_no_results() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/search")
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .create_async()
        .await;

    let err = client(&server).search(&params("zzzz qqqq", 5)).await.unwrap_err();
    assert!(matches!(err, SearchError::NoResults(q) if q == "zzzz qqqq"));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .with_status(200)
        .with_body("<html>not json</html>")
        .expect(1)
        .create_async()
        .await;

    let err = client(&server).search(&params("rust", 5)).await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, SearchError::Parse(_)));
}

#[tokio::test]
async fn blank_query_never_reaches_the_server() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .expect(0)
        .create_async()
        .await;

    let err = client(&server).search(&params("   ", 5)).await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, SearchError::InvalidQuery(_)));
}
