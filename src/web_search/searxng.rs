//! SearXNG client
//!
//! SearXNG takes the engine selection from its preferences cookie rather
//! than from form fields, so every request carries
//! `Cookie: disabled_engines=…;enabled_engines=…;method=POST`.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::{debug, info};

use super::errors::SearchError;
use super::retry::retry_with_backoff;
use super::types::{
    MAX_RETRIES, SEARCH_PAGE, SEARCH_SAFESEARCH, SEARCH_TIME_RANGE, SearchParams, SearchResult,
    SearchResults,
};
use super::{SearchBackend, validate_query};
use crate::config::ServiceConfig;
use crate::utils::constants::SERVICE_USER_AGENT;

/// Per-request timeout for the SearXNG call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Base delay for the retry backoff
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngHit>,
}

#[derive(Debug, Deserialize)]
struct SearxngHit {
    url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub struct SearxngClient {
    client: Client,
    endpoint: String,
    language: String,
    retry_delay: Duration,
}

impl SearxngClient {
    /// `endpoint` is the full search URL, e.g. `http://localhost:8080/search`
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent(SERVICE_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Request(format!("could not build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            language: language.into(),
            retry_delay: RETRY_BASE_DELAY,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, SearchError> {
        Self::new(config.searxng_api_base(), config.search_language())
    }

    /// Override the backoff base delay
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(&self, query: &str) -> Form {
        Form::new()
            .text("q", query.to_string())
            .text("format", "json")
            .text("language", self.language.clone())
            .text("time_range", SEARCH_TIME_RANGE)
            .text("safesearch", SEARCH_SAFESEARCH)
            .text("pageno", SEARCH_PAGE)
            .text("category_general", "1")
    }

    async fn request_once(&self, query: &str, cookie: &str) -> Result<Vec<SearxngHit>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(COOKIE, cookie)
            .header(ACCEPT, "*/*")
            .multipart(self.form(query))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::status(status.as_u16(), &body));
        }

        let parsed: SearxngResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Parse(e.to_string()))?;
        Ok(parsed.results)
    }

    /// Run one search, retrying transient failures
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults, SearchError> {
        let query = validate_query(&params.query)?;
        let preferences = format!(
            "disabled_engines={};enabled_engines={};method=POST",
            params.disabled_engines, params.enabled_engines
        );
        let cookie = preferences.as_str();

        info!(query, limit = params.limit, "Sending search request to SearXNG");
        let hits = retry_with_backoff(
            || self.request_once(query, cookie),
            MAX_RETRIES,
            self.retry_delay,
        )
        .await?;
        debug!(raw = hits.len(), "SearXNG answered");

        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|hit| {
                let url = hit.url.filter(|u| !u.trim().is_empty())?;
                Some((url, hit.title, hit.content))
            })
            .take(params.limit)
            .enumerate()
            .map(|(index, (url, title, snippet))| SearchResult {
                rank: index + 1,
                title,
                url,
                snippet,
            })
            .collect();

        if results.is_empty() {
            return Err(SearchError::NoResults(query.to_string()));
        }
        info!(query, count = results.len(), "Search completed");
        Ok(SearchResults::new(query.to_string(), results))
    }
}

impl SearchBackend for SearxngClient {
    fn search<'a>(
        &'a self,
        params: &'a SearchParams,
    ) -> BoxFuture<'a, Result<SearchResults, SearchError>> {
        Box::pin(SearxngClient::search(self, params))
    }

    fn name(&self) -> &'static str {
        "searxng"
    }
}
