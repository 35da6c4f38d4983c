// HTTP server: search-and-crawl API
//
// Reads configuration from the environment, launches the worker pool
// eagerly, then serves until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use searcrawl::browser_profile::cleanup_stale_profiles;
use searcrawl::cache::CacheManager;
use searcrawl::config::ServiceConfig;
use searcrawl::crawl_engine::{CrawlOrchestrator, OrchestratorSettings};
use searcrawl::fetcher::{FetchBackendKind, build_factory};
use searcrawl::logging;
use searcrawl::service::{SearchCrawlService, SearchDefaults, router};
use searcrawl::web_search::SearxngClient;
use searcrawl::worker_pool::WorkerPool;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    logging::init(config.log_level());

    if config.fetch_backend() == FetchBackendKind::Browser {
        match cleanup_stale_profiles() {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Removed stale browser profiles"),
            Err(e) => warn!(error = %e, "Could not clean stale browser profiles"),
        }
    }

    let factory = build_factory(&config)
        .await
        .context("failed to prepare fetch backend")?;
    let pool = WorkerPool::start(factory, config.pool_size())
        .await
        .context("failed to start worker pool")?;
    let cache = Arc::new(CacheManager::from_config(&config).await);
    let orchestrator = Arc::new(CrawlOrchestrator::new(
        Arc::clone(&pool),
        cache,
        OrchestratorSettings::from_config(&config),
    ));
    let search = Arc::new(SearxngClient::from_config(&config).context("failed to build search client")?);

    let service = Arc::new(SearchCrawlService::new(
        search,
        Arc::clone(&orchestrator),
        SearchDefaults::from_config(&config),
        config.summary(),
    ));

    let bind_addr = format!("{}:{}", config.api_host(), config.api_port());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(
        addr = %bind_addr,
        searxng = %config.searxng_api_base(),
        backend = %config.fetch_backend(),
        pool_size = config.pool_size(),
        "searcrawl listening"
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down");
    orchestrator.flush_writes().await;
    pool.shutdown(config.shutdown_drain()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
