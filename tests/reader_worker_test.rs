//! Reader-backed workers against a mock reader service

use std::time::Duration;

use mockito::{Matcher, Server};

use searcrawl::content::ContentPipeline;
use searcrawl::fetcher::ReaderWorkerFactory;
use searcrawl::worker_pool::{FetchError, Worker, WorkerFactory};

const PAGE: &str = "https://docs.example/guide";

fn page_path() -> Matcher {
    Matcher::Regex(r"^/https://docs\.example/guide$".into())
}

async fn worker(server: &Server, api_key: Option<&str>) -> Box<dyn Worker> {
    let factory = ReaderWorkerFactory::new(
        &format!("{}/", server.url()),
        api_key.map(str::to_string),
        ContentPipeline::new(5, 0.5),
    )
    .unwrap();
    assert_eq!(factory.kind(), "reader");
    factory.create(0).await.unwrap()
}

#[tokio::test]
async fn markdown_envelope_becomes_pruned_text() {
    let mut server = Server::new_async().await;
    let body = serde_json::json!({
        "code": 200,
        "data": {
            "title": "Guide",
            "content": "# Guide\n\n[Home](/) | [Docs](/docs)\n\nInstall the **toolchain** first, then run the setup script from the project root."
        }
    });
    let mock = server
        .mock("GET", page_path())
        .match_header("accept", "application/json")
        .match_header("x-respond-with", "markdown")
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let mut worker = worker(&server, Some("secret-token")).await;
    let text = worker
        .fetch(PAGE, "setup steps", Duration::from_secs(5))
        .await
        .unwrap();
    mock.assert_async().await;

    assert!(text.contains("Install the toolchain first"));
    assert!(text.contains("Guide"));
    assert!(!text.contains("[Home]"));
    assert!(!text.contains("**"));
}

#[tokio::test]
async fn plain_markdown_body_is_accepted() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", page_path())
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("The reader answered with bare markdown instead of the JSON envelope today.")
        .create_async()
        .await;

    let mut worker = worker(&server, None).await;
    let text = worker.fetch(PAGE, "", Duration::from_secs(5)).await.unwrap();
    assert!(text.starts_with("The reader answered"));
}

#[tokio::test]
async fn non_200_is_an_http_fault() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", page_path())
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let mut worker = worker(&server, None).await;
    let err = worker.fetch(PAGE, "", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, FetchError::Http(ref msg) if msg.contains("429")));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_content_is_not_retryable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", page_path())
        .with_status(200)
        .with_body(r#"{"code":200,"data":{"content":"   "}}"#)
        .create_async()
        .await;

    let mut worker = worker(&server, None).await;
    let err = worker.fetch(PAGE, "", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyContent));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_reader_is_a_navigation_fault() {
    // Bind then drop a listener so the port is known to be closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let factory = ReaderWorkerFactory::new(
        &format!("http://{addr}"),
        None,
        ContentPipeline::new(5, 0.5),
    )
    .unwrap();
    let mut worker = factory.create(7).await.unwrap();
    let err = worker.fetch(PAGE, "", Duration::from_secs(2)).await.unwrap_err();
    assert!(matches!(err, FetchError::Navigation(_)));
    worker.close().await;
}
