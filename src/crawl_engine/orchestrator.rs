//! Cache-aware, pool-bounded batch crawling
//!
//! One call to [`CrawlOrchestrator::crawl`]:
//! 1. De-duplicates the URLs (first occurrence wins)
//! 2. Looks every task up in the cache in one batch read
//! 3. Spawns one fetch task per miss; each waits for a pooled worker, so at
//!    most `capacity` fetches run at once across the whole process
//! 4. Filters fresh text through the quality gate
//! 5. Hands new successes to a background cache write
//! 6. Reassembles everything in input order
//!
//! Per-URL failures never abort the batch. A batch deadline cancels what is
//! still pending and returns whatever finished. The cache lookup is bounded
//! by the cache manager's own per-call timeout, and the batch deadline is
//! measured from the end of the lookup, so a slow store cannot eat the
//! fetch budget.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::task::JoinSet;

use super::crawl_types::{
    BatchResult, CrawlOutcome, CrawlTask, CrawledContent, FailureReason, UrlFailure,
};
use super::fetch_timeout::with_fetch_timeout;
use super::quality::QualityGate;
use crate::cache::{CacheEntry, CacheKey, CacheManager};
use crate::config::ServiceConfig;
use crate::utils::dedup_urls;
use crate::worker_pool::{PoolError, WorkerPool};

/// Timing and retry knobs for the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// How long one fetch may wait for a free worker
    pub acquire_timeout: Duration,
    /// Ceiling on a single fetch, including extraction
    pub fetch_timeout: Duration,
    /// Ceiling on the whole batch; must exceed `fetch_timeout`
    pub batch_timeout: Duration,
    /// Extra attempts for retryable fetch faults
    pub fetch_retries: u8,
    /// Whole-document minimum for the quality gate
    pub min_word_count: usize,
}

impl OrchestratorSettings {
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            acquire_timeout: config.pool_acquire_timeout(),
            fetch_timeout: config.fetch_timeout(),
            batch_timeout: config.batch_timeout(),
            fetch_retries: config.fetch_retries(),
            min_word_count: config.min_word_count(),
        }
    }
}

/// Per-call switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Skip the cache read; fresh results are still written back
    pub bypass_cache: bool,
}

pub struct CrawlOrchestrator {
    pool: Arc<WorkerPool>,
    cache: Arc<CacheManager>,
    settings: OrchestratorSettings,
    quality: QualityGate,
    /// Background cache writes, reaped opportunistically
    writes: Mutex<JoinSet<()>>,
}

impl CrawlOrchestrator {
    pub fn new(
        pool: Arc<WorkerPool>,
        cache: Arc<CacheManager>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            pool,
            cache,
            quality: QualityGate::new(settings.min_word_count),
            settings,
            writes: Mutex::new(JoinSet::new()),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Crawl `urls` with one shared `instruction`.
    ///
    /// Never fails as a whole: every de-duplicated URL ends up either in
    /// `ordered_contents` or in `failures`.
    pub async fn crawl<S: AsRef<str>>(
        &self,
        urls: &[S],
        instruction: &str,
        options: CrawlOptions,
    ) -> BatchResult {
        let tasks: Vec<CrawlTask> = dedup_urls(urls)
            .into_iter()
            .map(|url| CrawlTask::new(url, instruction))
            .collect();
        if tasks.is_empty() {
            return BatchResult::default();
        }

        let started = Instant::now();
        let mut outcomes: Vec<Option<CrawlOutcome>> = vec![None; tasks.len()];

        if self.cache.is_enabled() && !options.bypass_cache {
            self.fill_cache_hits(&tasks, &mut outcomes).await;
        }
        let deadline = tokio::time::Instant::now() + self.settings.batch_timeout;

        let misses: Vec<usize> = (0..tasks.len()).filter(|&i| outcomes[i].is_none()).collect();
        if !misses.is_empty() {
            self.fetch_misses(&tasks, &misses, &mut outcomes, deadline)
                .await;
        }

        let fresh: Vec<(CacheKey, CacheEntry)> = tasks
            .iter()
            .zip(&outcomes)
            .filter_map(|(task, outcome)| match outcome {
                Some(CrawlOutcome::Fetched(content)) => Some((
                    task.cache_key(),
                    CacheEntry::new(task.url.clone(), content.clone()),
                )),
                _ => None,
            })
            .collect();
        self.schedule_write_back(fresh);

        let result = assemble(tasks, outcomes);
        info!(
            "Batch finished in {:?}: {} hits, {} crawled, {} failed",
            started.elapsed(),
            result.cache_hits,
            result.newly_crawled,
            result.failures.len()
        );
        result
    }

    async fn fill_cache_hits(&self, tasks: &[CrawlTask], outcomes: &mut [Option<CrawlOutcome>]) {
        let hits = self.cache.get_many(tasks).await;
        if hits.is_empty() {
            return;
        }
        for (task, slot) in tasks.iter().zip(outcomes.iter_mut()) {
            if let Some(entry) = hits.get(&task.cache_key()) {
                *slot = Some(CrawlOutcome::Hit(entry.content.clone()));
            }
        }
    }

    async fn fetch_misses(
        &self,
        tasks: &[CrawlTask],
        misses: &[usize],
        outcomes: &mut [Option<CrawlOutcome>],
        deadline: tokio::time::Instant,
    ) {
        debug!("Dispatching {} fetches to the worker pool", misses.len());

        let mut join_set = JoinSet::new();
        let mut index_of = HashMap::with_capacity(misses.len());
        for &i in misses {
            let task = tasks[i].clone();
            let pool = Arc::clone(&self.pool);
            let settings = self.settings;
            let quality = self.quality;
            let handle = join_set.spawn(async move {
                fetch_one(&pool, &task, settings, quality).await
            });
            index_of.insert(handle.id(), i);
        }

        loop {
            match tokio::time::timeout_at(deadline, join_set.join_next_with_id()).await {
                Ok(Some(Ok((id, outcome)))) => {
                    if let Some(&i) = index_of.get(&id) {
                        outcomes[i] = Some(outcome);
                    }
                }
                Ok(Some(Err(join_err))) => {
                    if let Some(&i) = index_of.get(&join_err.id()) {
                        warn!("Fetch task for {} died: {}", tasks[i].url, join_err);
                        outcomes[i] = Some(CrawlOutcome::Failed(FailureReason::Fault(
                            "fetch task aborted".into(),
                        )));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Batch deadline reached with {} fetches pending, cancelling them",
                        join_set.len()
                    );
                    // Dropped tasks release their workers through the guard
                    join_set.abort_all();
                    break;
                }
            }
        }

        for &i in misses {
            outcomes[i].get_or_insert(CrawlOutcome::Failed(FailureReason::Cancelled));
        }
    }

    fn schedule_write_back(&self, fresh: Vec<(CacheKey, CacheEntry)>) {
        if fresh.is_empty() || !self.cache.is_enabled() {
            return;
        }
        let cache = Arc::clone(&self.cache);
        let ttl = cache.crawl_ttl();
        let mut writes = self.writes.lock();
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            let total = fresh.len();
            let written = cache.put_many(fresh, ttl).await;
            if written < total {
                warn!("Cache write-back stored {} of {} entries", written, total);
            }
        });
    }

    /// Wait for every pending cache write to finish
    pub async fn flush_writes(&self) {
        let mut pending = std::mem::take(&mut *self.writes.lock());
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!("Cache write task failed: {}", e);
            }
        }
    }
}

/// One miss: acquire, fetch, release, retry if the fault is retryable.
///
/// The worker is released between attempts, so a retry waits in line like
/// any other fetch.
async fn fetch_one(
    pool: &Arc<WorkerPool>,
    task: &CrawlTask,
    settings: OrchestratorSettings,
    quality: QualityGate,
) -> CrawlOutcome {
    let attempts = u32::from(settings.fetch_retries) + 1;
    let mut last_failure = FailureReason::Cancelled;

    for attempt in 1..=attempts {
        let mut guard = match pool.acquire(settings.acquire_timeout).await {
            Ok(guard) => guard,
            Err(PoolError::Exhausted { waited }) => {
                warn!("No worker for {} after {:?}", task.url, waited);
                // A retry that cannot get a worker keeps the first attempt's failure
                if attempt > 1 {
                    return CrawlOutcome::Failed(last_failure);
                }
                return CrawlOutcome::Failed(FailureReason::PoolExhausted);
            }
            Err(PoolError::ShutDown) => return CrawlOutcome::Failed(FailureReason::Cancelled),
            Err(e @ PoolError::Launch(_)) => {
                return CrawlOutcome::Failed(FailureReason::Fault(e.to_string()));
            }
        };

        let result = with_fetch_timeout(
            guard.fetch(&task.url, &task.instruction, settings.fetch_timeout),
            settings.fetch_timeout,
        )
        .await;
        drop(guard);

        match result {
            Ok(text) => {
                return match quality.check(&task.url, &text) {
                    Ok(words) => {
                        debug!("Fetched {} ({} words)", task.url, words);
                        CrawlOutcome::Fetched(text)
                    }
                    Err(reason) => CrawlOutcome::Failed(reason),
                };
            }
            Err(err) => {
                warn!(
                    "Fetch failed for {} (attempt {}/{}): {}",
                    task.url, attempt, attempts, err
                );
                last_failure = FailureReason::from(&err);
                if !err.is_retryable() {
                    break;
                }
            }
        }
    }
    CrawlOutcome::Failed(last_failure)
}

fn assemble(tasks: Vec<CrawlTask>, outcomes: Vec<Option<CrawlOutcome>>) -> BatchResult {
    let mut result = BatchResult::default();
    for (task, outcome) in tasks.into_iter().zip(outcomes) {
        match outcome.unwrap_or(CrawlOutcome::Failed(FailureReason::Cancelled)) {
            CrawlOutcome::Hit(content) => {
                result.cache_hits += 1;
                result.ordered_contents.push(CrawledContent {
                    reference: task.url,
                    content,
                    from_cache: true,
                });
            }
            CrawlOutcome::Fetched(content) => {
                result.newly_crawled += 1;
                result.ordered_contents.push(CrawledContent {
                    reference: task.url,
                    content,
                    from_cache: false,
                });
            }
            CrawlOutcome::Failed(reason) => result.failures.push(UrlFailure {
                url: task.url,
                reason,
            }),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_keeps_input_order_and_counts() {
        let tasks = vec![
            CrawlTask::new("https://a.example/", ""),
            CrawlTask::new("https://b.example/", ""),
            CrawlTask::new("https://c.example/", ""),
            CrawlTask::new("https://d.example/", ""),
        ];
        let outcomes = vec![
            Some(CrawlOutcome::Fetched("a".into())),
            Some(CrawlOutcome::Failed(FailureReason::Timeout)),
            Some(CrawlOutcome::Hit("c".into())),
            None,
        ];
        let result = assemble(tasks, outcomes);

        let refs: Vec<_> = result
            .ordered_contents
            .iter()
            .map(|c| c.reference.as_str())
            .collect();
        assert_eq!(refs, ["https://a.example/", "https://c.example/"]);
        assert_eq!(result.cache_hits, 1);
        assert_eq!(result.newly_crawled, 1);
        assert_eq!(
            result.failures,
            vec![
                UrlFailure {
                    url: "https://b.example/".into(),
                    reason: FailureReason::Timeout
                },
                UrlFailure {
                    url: "https://d.example/".into(),
                    reason: FailureReason::Cancelled
                },
            ]
        );
    }
}
