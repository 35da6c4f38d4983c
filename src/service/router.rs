//! HTTP routes
//!
//! - `POST /search`: search, then crawl the results
//! - `POST /crawl`: crawl an explicit URL list
//! - `GET /health`: pool and cache status
//! - `GET /config`: secret-free configuration summary
//! - `GET /cache/stats`: entry count and backend facts
//! - `DELETE /cache`: drop every crawl entry
//! - `DELETE /cache/entry`: drop one (URL, instruction) entry

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{delete, get, post};

use super::errors::ServiceError;
use super::pipeline::SearchCrawlService;
use super::types::{
    CacheEntryRequest, ClearCacheResponse, CrawlRequest, CrawlResponse, HealthResponse,
    SearchRequest,
};
use crate::cache::CacheStats;
use crate::config::ConfigSummary;

type AppState = Arc<SearchCrawlService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/crawl", post(handle_crawl))
        .route("/health", get(handle_health))
        .route("/config", get(handle_config))
        .route("/cache/stats", get(handle_cache_stats))
        .route("/cache", delete(handle_clear_cache))
        .route("/cache/entry", delete(handle_clear_entry))
        .with_state(service)
}

async fn handle_search(
    State(service): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<CrawlResponse>, ServiceError> {
    service.search_and_crawl(request).await.map(Json)
}

async fn handle_crawl(
    State(service): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<CrawlResponse>, ServiceError> {
    service.crawl(request).await.map(Json)
}

async fn handle_health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(service.health().await)
}

async fn handle_config(State(service): State<AppState>) -> Json<ConfigSummary> {
    Json(service.config_summary().clone())
}

async fn handle_cache_stats(State(service): State<AppState>) -> Json<CacheStats> {
    Json(service.cache_stats().await)
}

async fn handle_clear_cache(
    State(service): State<AppState>,
) -> Result<Json<ClearCacheResponse>, ServiceError> {
    service.clear_cache().await.map(Json)
}

async fn handle_clear_entry(
    State(service): State<AppState>,
    Json(request): Json<CacheEntryRequest>,
) -> Result<Json<ClearCacheResponse>, ServiceError> {
    service.clear_entry(request).await.map(Json)
}
