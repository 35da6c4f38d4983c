//! Cache manager: keying, batch lookups and writes, outage handling.
//!
//! **Failure policy:** any store error flips the manager into a disabled
//! window of `recheck` length. Inside the window every read is an empty
//! miss and every write is skipped, without touching the store. The first
//! call after the window probes the store with `PING` and re-enables it on
//! success. Nothing here returns a store error to a crawl request.
//!
//! Every store call runs under `op_timeout`. A call that runs past it counts
//! as the store being unreachable, so a store that accepts connections but
//! never answers is bypassed just like one that refuses them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::utils::DEFAULT_CACHE_TIMEOUT_MS;
use crate::crawl_engine::CrawlTask;
use crate::utils::timestamp_utils::{instant_to_nanos, nanos_to_instant};

use super::errors::{CacheError, CacheResult};
use super::key::{CRAWL_KEY_PREFIX, CacheKey};
use super::memory_store::MemoryStore;
use super::redis_store::RedisStore;
use super::store::CacheStore;

/// Prefix scans (stats, clear) get this many `op_timeout`s
const SCAN_TIMEOUT_FACTOR: u32 = 10;

/// What is stored under a crawl key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: String,
    pub url: String,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
            stored_at: Utc::now(),
        }
    }
}

/// What is stored under a search key
#[derive(Serialize, Deserialize)]
struct SearchEnvelope<T> {
    result: T,
    query: String,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Available,
    /// Store configured but currently unreachable
    Unavailable,
    /// Turned off by configuration
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    pub status: CacheStatus,
    pub backend: Option<String>,
    pub entry_count: u64,
    pub memory_used: Option<String>,
    pub backend_version: Option<String>,
    pub error: Option<String>,
}

impl CacheStats {
    fn without_store(status: CacheStatus, error: Option<String>) -> Self {
        Self {
            status,
            backend: None,
            entry_count: 0,
            memory_used: None,
            backend_version: None,
            error,
        }
    }
}

pub struct CacheManager {
    store: Option<Arc<dyn CacheStore>>,
    crawl_ttl: Duration,
    search_ttl: Duration,
    recheck: Duration,
    op_timeout: Duration,
    reachable: AtomicBool,
    /// Earliest instant (as epoch nanos) at which an unreachable store is probed again
    retry_at: AtomicU64,
}

impl CacheManager {
    /// Wrap a store. The manager starts optimistic: the first failure opens
    /// the disabled window.
    pub fn new(
        store: Arc<dyn CacheStore>,
        crawl_ttl: Duration,
        search_ttl: Duration,
        recheck: Duration,
    ) -> Self {
        Self {
            store: Some(store),
            crawl_ttl,
            search_ttl,
            recheck,
            op_timeout: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
            reachable: AtomicBool::new(true),
            retry_at: AtomicU64::new(0),
        }
    }

    /// Bound every store call by `timeout` instead of the default
    #[must_use]
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// A manager with no store at all; every read misses, every write is skipped
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: None,
            crawl_ttl: Duration::ZERO,
            search_ttl: Duration::ZERO,
            recheck: Duration::ZERO,
            op_timeout: Duration::ZERO,
            reachable: AtomicBool::new(false),
            retry_at: AtomicU64::new(0),
        }
    }

    /// Build from configuration and probe the store once.
    ///
    /// `REDIS_URL=memory://` selects the in-process store. An unreachable
    /// Redis is logged and left to the recheck logic, never fatal.
    pub async fn from_config(config: &ServiceConfig) -> Self {
        if !config.cache_enabled() {
            info!("Cache disabled by configuration");
            return Self::disabled();
        }

        let store: Arc<dyn CacheStore> = if config.redis_url().starts_with("memory://") {
            Arc::new(MemoryStore::new())
        } else {
            match RedisStore::new(config.redis_url(), config.cache_timeout()) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "Cache store misconfigured, running without cache");
                    return Self::disabled();
                }
            }
        };

        let manager = Self::new(
            store,
            config.cache_ttl(),
            config.search_cache_ttl(),
            config.cache_recheck_interval(),
        )
        .with_op_timeout(config.cache_timeout());
        match manager.probe().await {
            true => info!(
                backend = manager.backend_name(),
                ttl_hours = config.cache_ttl_hours(),
                "Cache manager initialized"
            ),
            false => warn!(
                backend = manager.backend_name(),
                "Cache store unreachable at startup, crawls will bypass the cache"
            ),
        }
        manager
    }

    #[must_use]
    pub fn compute_key(url: &str, instruction: &str) -> CacheKey {
        CacheKey::for_crawl(url, instruction)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Last known reachability. Does no I/O.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.store.is_some() && self.reachable.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn crawl_ttl(&self) -> Duration {
        self.crawl_ttl
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.as_ref().map_or("none", |s| s.backend_name())
    }

    /// Ping the store now, regardless of the recheck window.
    pub async fn probe(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match self.bounded(self.op_timeout, "ping", store.ping()).await {
            Ok(()) => {
                self.mark_reachable();
                true
            }
            Err(e) => {
                self.mark_unreachable(&e);
                false
            }
        }
    }

    /// Reachability for health checks: a bounded `PING`, or no I/O at all
    /// while the disabled window is open.
    pub async fn status(&self) -> CacheStatus {
        if self.store.is_none() {
            return CacheStatus::Disabled;
        }
        if !self.reachable.load(Ordering::Acquire)
            && Instant::now() < nanos_to_instant(self.retry_at.load(Ordering::Acquire))
        {
            return CacheStatus::Unavailable;
        }
        if self.probe().await {
            CacheStatus::Available
        } else {
            CacheStatus::Unavailable
        }
    }

    /// Run one store call under `limit`; running past it means unreachable.
    async fn bounded<T>(
        &self,
        limit: Duration,
        op: &'static str,
        call: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Unavailable(format!(
                "{op} timed out after {limit:?}"
            ))),
        }
    }

    fn scan_timeout(&self) -> Duration {
        self.op_timeout * SCAN_TIMEOUT_FACTOR
    }

    /// The store to use for this call, or `None` while disabled.
    async fn active_store(&self) -> Option<&Arc<dyn CacheStore>> {
        let store = self.store.as_ref()?;
        if self.reachable.load(Ordering::Acquire) {
            return Some(store);
        }
        let retry_at = nanos_to_instant(self.retry_at.load(Ordering::Acquire));
        if Instant::now() < retry_at {
            return None;
        }
        self.probe().await.then_some(store)
    }

    fn mark_unreachable(&self, err: &CacheError) {
        let retry_at = Instant::now() + self.recheck;
        self.retry_at
            .store(instant_to_nanos(retry_at), Ordering::Release);
        if self.reachable.swap(false, Ordering::AcqRel) {
            warn!(
                error = %err,
                recheck_secs = self.recheck.as_secs(),
                "Cache store unreachable, bypassing cache"
            );
        }
    }

    fn mark_reachable(&self) {
        if !self.reachable.swap(true, Ordering::AcqRel) {
            info!("Cache store reachable again");
        }
    }

    fn record_failure(&self, err: &CacheError) {
        match err {
            CacheError::Unavailable(_) => self.mark_unreachable(err),
            _ => warn!(error = %err, "Cache store error"),
        }
    }

    /// Batch lookup for a set of crawl tasks. Only hits are present in the map.
    pub async fn get_many(&self, tasks: &[CrawlTask]) -> HashMap<CacheKey, CacheEntry> {
        let mut hits = HashMap::new();
        if tasks.is_empty() {
            return hits;
        }
        let Some(store) = self.active_store().await else {
            return hits;
        };

        let keys: Vec<CacheKey> = tasks.iter().map(CrawlTask::cache_key).collect();
        let raw_keys: Vec<String> = keys.iter().map(|k| k.as_str().to_string()).collect();
        let values = match self
            .bounded(self.op_timeout, "batch get", store.get_many(&raw_keys))
            .await
        {
            Ok(values) => values,
            Err(e) => {
                self.record_failure(&e);
                return hits;
            }
        };

        for ((key, task), value) in keys.into_iter().zip(tasks).zip(values) {
            let Some(raw) = value else {
                debug!(url = %task.url, "Cache miss");
                continue;
            };
            match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => {
                    debug!(url = %task.url, "Cache hit");
                    hits.insert(key, entry);
                }
                Err(e) => warn!(url = %task.url, error = %e, "Discarding undecodable cache entry"),
            }
        }
        hits
    }

    /// Best-effort batch write. Each key stands alone; failures are logged
    /// and dropped. Returns how many entries were written.
    pub async fn put_many(&self, entries: Vec<(CacheKey, CacheEntry)>, ttl: Duration) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let Some(store) = self.active_store().await else {
            debug!(count = entries.len(), "Cache unavailable, write skipped");
            return 0;
        };

        let mut encoded = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match serde_json::to_string(&entry) {
                Ok(value) => encoded.push((key.into_string(), value)),
                Err(e) => warn!(url = %entry.url, error = %e, "Could not encode cache entry"),
            }
        }

        let results = match tokio::time::timeout(self.op_timeout, store.set_many(&encoded, ttl)).await {
            Ok(results) => results,
            Err(_) => {
                let err = CacheError::Unavailable(format!(
                    "batch write timed out after {:?}",
                    self.op_timeout
                ));
                warn!(count = encoded.len(), "Cache write-back timed out, dropping entries");
                self.record_failure(&err);
                return 0;
            }
        };
        let mut written = 0;
        for ((key, _), result) in encoded.iter().zip(results) {
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache write failed, dropping entry");
                    self.record_failure(&e);
                }
            }
        }
        debug!(written, total = encoded.len(), "Cache write-back finished");
        written
    }

    pub async fn get_search<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let store = self.active_store().await?;
        match self.bounded(self.op_timeout, "get", store.get(key.as_str())).await {
            Ok(Some(raw)) => match serde_json::from_str::<SearchEnvelope<T>>(&raw) {
                Ok(envelope) => {
                    debug!(query = %envelope.query, "Search cache hit");
                    Some(envelope.result)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding undecodable search cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.record_failure(&e);
                None
            }
        }
    }

    pub async fn put_search<T: Serialize>(&self, key: &CacheKey, query: &str, result: &T) -> bool {
        let Some(store) = self.active_store().await else {
            return false;
        };
        let envelope = SearchEnvelope {
            result,
            query: query.to_string(),
            stored_at: Utc::now(),
        };
        let value = match serde_json::to_string(&envelope) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Could not encode search cache entry");
                return false;
            }
        };
        match self
            .bounded(
                self.op_timeout,
                "set",
                store.set_ex(key.as_str(), &value, self.search_ttl),
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.record_failure(&e);
                false
            }
        }
    }

    /// Entry count and backend facts for the crawl namespace
    pub async fn stats(&self) -> CacheStats {
        let Some(store) = &self.store else {
            return CacheStats::without_store(CacheStatus::Disabled, None);
        };
        if self.active_store().await.is_none() {
            return CacheStats::without_store(CacheStatus::Unavailable, None);
        }

        let collected: CacheResult<_> = async {
            let count = self
                .bounded(self.scan_timeout(), "count", store.count_prefix(CRAWL_KEY_PREFIX))
                .await?;
            let info = self.bounded(self.op_timeout, "info", store.info()).await?;
            Ok((count, info))
        }
        .await;

        match collected {
            Ok((entry_count, info)) => CacheStats {
                status: CacheStatus::Available,
                backend: Some(store.backend_name().to_string()),
                entry_count,
                memory_used: info.memory_used,
                backend_version: info.backend_version,
                error: None,
            },
            Err(e) => {
                self.record_failure(&e);
                CacheStats::without_store(CacheStatus::Unavailable, Some(e.to_string()))
            }
        }
    }

    /// Remove one entry, or every crawl entry when `key` is `None`.
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self, key: Option<&CacheKey>) -> CacheResult<u64> {
        let Some(store) = self.active_store().await else {
            return Err(CacheError::Unavailable(
                "cache is disabled or unreachable".into(),
            ));
        };
        let result = match key {
            Some(key) => self
                .bounded(self.op_timeout, "delete", store.delete(key.as_str()))
                .await
                .map(u64::from),
            None => {
                self.bounded(
                    self.scan_timeout(),
                    "clear",
                    store.delete_prefix(CRAWL_KEY_PREFIX),
                )
                .await
            }
        };
        match result {
            Ok(removed) => {
                info!(removed, single = key.is_some(), "Cache cleared");
                Ok(removed)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }
}
