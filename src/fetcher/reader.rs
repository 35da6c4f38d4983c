//! Reader-service fetch worker
//!
//! Rendering is delegated to an HTTP reader (`GET {reader_url}/{url}`) that
//! answers with markdown. The worker still goes through the pool, so the
//! reader sees at most `POOL_SIZE` concurrent requests from this process.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::content::ContentPipeline;
use crate::utils::constants::SERVICE_USER_AGENT;
use crate::utils::string_utils::preview;
use crate::worker_pool::{FetchError, Worker, WorkerFactory};

/// JSON envelope returned when the reader honours `Accept: application/json`
#[derive(Debug, Deserialize)]
struct ReaderEnvelope {
    data: ReaderData,
}

#[derive(Debug, Deserialize)]
struct ReaderData {
    #[serde(default)]
    content: String,
}

/// Markdown out of a reader body: the JSON envelope when present, the raw
/// body otherwise
fn body_markdown(body: String) -> String {
    match serde_json::from_str::<ReaderEnvelope>(&body) {
        Ok(envelope) => envelope.data.content,
        Err(_) => body,
    }
}

fn map_request_error(err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if err.is_connect() {
        FetchError::Navigation(format!("reader unreachable: {err}"))
    } else {
        FetchError::Http(err.to_string())
    }
}

pub struct ReaderWorker {
    id: u64,
    client: Client,
    reader_url: String,
    api_key: Option<String>,
    pipeline: ContentPipeline,
}

impl ReaderWorker {
    async fn fetch_markdown(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let endpoint = format!("{}/{}", self.reader_url, url);
        let mut request = self
            .client
            .get(&endpoint)
            .timeout(timeout)
            .header("Accept", "application/json")
            .header("X-Respond-With", "markdown");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_request_error(&e, timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_request_error(&e, timeout))?;

        if status != StatusCode::OK {
            warn!(
                worker = self.id,
                url,
                %status,
                "Reader rejected request: {}",
                preview(&body, 200)
            );
            return Err(FetchError::Http(format!("reader returned {status}")));
        }
        Ok(body_markdown(body))
    }
}

impl Worker for ReaderWorker {
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        _instruction: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let markdown = self.fetch_markdown(url, timeout).await?;
            if markdown.trim().is_empty() {
                return Err(FetchError::EmptyContent);
            }
            debug!(worker = self.id, url, bytes = markdown.len(), "Reader returned markdown");

            let text = self.pipeline.process_markdown(&markdown);
            if text.trim().is_empty() {
                return Err(FetchError::EmptyContent);
            }
            Ok(text)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            debug!(worker = self.id, "Reader worker closed");
        })
    }
}

/// Hands every worker a clone of one shared HTTP client
pub struct ReaderWorkerFactory {
    client: Client,
    reader_url: String,
    api_key: Option<String>,
    pipeline: ContentPipeline,
}

impl ReaderWorkerFactory {
    pub fn new(reader_url: &str, api_key: Option<String>, pipeline: ContentPipeline) -> Result<Self> {
        let client = Client::builder()
            .user_agent(SERVICE_USER_AGENT)
            .build()
            .context("Failed to build reader HTTP client")?;
        Ok(Self {
            client,
            reader_url: reader_url.trim_end_matches('/').to_string(),
            api_key,
            pipeline,
        })
    }
}

impl WorkerFactory for ReaderWorkerFactory {
    fn create(&self, id: u64) -> BoxFuture<'_, Result<Box<dyn Worker>>> {
        Box::pin(async move {
            Ok(Box::new(ReaderWorker {
                id,
                client: self.client.clone(),
                reader_url: self.reader_url.clone(),
                api_key: self.api_key.clone(),
                pipeline: self.pipeline,
            }) as Box<dyn Worker>)
        })
    }

    fn kind(&self) -> &'static str {
        "reader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_content_is_unwrapped() {
        let body = r#"{"code":200,"data":{"title":"T","url":"https://a.example","content":"Hello"}}"#;
        assert_eq!(body_markdown(body.to_string()), "Hello");
        assert_eq!(body_markdown("# Plain markdown".to_string()), "# Plain markdown");
    }
}
