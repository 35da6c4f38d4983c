//! Test doubles shared by the integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use searcrawl::cache::{CacheManager, CacheResult, CacheStore, MemoryStore, StoreInfo};
use searcrawl::crawl_engine::{CrawlOrchestrator, OrchestratorSettings};
use searcrawl::worker_pool::{FetchError, Worker, WorkerFactory, WorkerPool};

/// What a scripted worker does when asked for a URL
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Behavior {
    /// Return the text immediately
    Text(String),
    /// Sleep, then return the text
    Slow(Duration, String),
    /// Fail with the given error
    Fail(FetchError),
    /// Never finish
    Hang,
}

/// `n` distinct words, enough to clear any quality gate below `n`
#[allow(dead_code)]
pub fn words(n: usize) -> String {
    (0..n).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
}

#[derive(Default)]
struct Shared {
    /// Per-URL behaviors; the last one repeats
    scripts: Mutex<HashMap<String, VecDeque<Behavior>>>,
    default: Mutex<Option<Behavior>>,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    created: AtomicUsize,
    closed: AtomicUsize,
}

impl Shared {
    fn next_behavior(&self, url: &str) -> Behavior {
        let mut scripts = self.scripts.lock();
        if let Some(queue) = scripts.get_mut(url) {
            if queue.len() > 1 {
                if let Some(b) = queue.pop_front() {
                    return b;
                }
            }
            if let Some(b) = queue.front() {
                return b.clone();
            }
        }
        self.default
            .lock()
            .clone()
            .unwrap_or_else(|| Behavior::Text(words(50)))
    }
}

/// Decrements the in-flight counter even when the fetch is cancelled
struct InFlight<'a>(&'a Shared);

impl<'a> InFlight<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ScriptedWorker {
    shared: Arc<Shared>,
}

impl Worker for ScriptedWorker {
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        _instruction: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let _in_flight = InFlight::enter(&self.shared);
            self.shared.fetched.lock().push(url.to_string());
            match self.shared.next_behavior(url) {
                Behavior::Text(text) => Ok(text),
                Behavior::Slow(delay, text) => {
                    tokio::time::sleep(delay).await;
                    Ok(text)
                }
                Behavior::Fail(err) => Err(err),
                Behavior::Hang => std::future::pending().await,
            }
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Worker factory whose workers follow per-URL scripts and count everything
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    shared: Arc<Shared>,
}

#[allow(dead_code)]
impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `url`; repeated calls queue behaviors for successive fetches
    pub fn on(&self, url: &str, behavior: Behavior) -> &Self {
        self.shared
            .scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(behavior);
        self
    }

    /// Behavior for every unscripted URL
    pub fn by_default(&self, behavior: Behavior) -> &Self {
        *self.shared.default.lock() = Some(behavior);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.shared.fetched.lock().len()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.shared.fetched.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl WorkerFactory for ScriptedFactory {
    fn create(&self, _id: u64) -> BoxFuture<'_, anyhow::Result<Box<dyn Worker>>> {
        Box::pin(async move {
            self.shared.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedWorker {
                shared: Arc::clone(&self.shared),
            }) as Box<dyn Worker>)
        })
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}

/// Short timeouts suited to tests
#[allow(dead_code)]
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        acquire_timeout: Duration::from_secs(2),
        fetch_timeout: Duration::from_secs(1),
        batch_timeout: Duration::from_secs(5),
        fetch_retries: 0,
        min_word_count: 10,
    }
}

#[allow(dead_code)]
pub fn memory_cache(store: &Arc<MemoryStore>) -> Arc<CacheManager> {
    Arc::new(CacheManager::new(
        Arc::clone(store) as _,
        Duration::from_secs(3600),
        Duration::from_secs(60),
        Duration::from_millis(50),
    ))
}

/// Everything an orchestrator test needs a handle on
#[allow(dead_code)]
pub struct Harness {
    pub factory: ScriptedFactory,
    pub store: Arc<MemoryStore>,
    pub pool: Arc<WorkerPool>,
    pub orchestrator: CrawlOrchestrator,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new(pool_size: usize, settings: OrchestratorSettings) -> Self {
        Self::with_factory(ScriptedFactory::new(), pool_size, settings).await
    }

    pub async fn with_factory(
        factory: ScriptedFactory,
        pool_size: usize,
        settings: OrchestratorSettings,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let pool = WorkerPool::start(Arc::new(factory.clone()), pool_size)
            .await
            .expect("scripted pool starts");
        let orchestrator =
            CrawlOrchestrator::new(Arc::clone(&pool), memory_cache(&store), settings);
        Self {
            factory,
            store,
            pool,
            orchestrator,
        }
    }
}

/// A store that accepts every call and never answers
#[derive(Default)]
#[allow(dead_code)]
pub struct HangingStore {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl HangingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hang<'a, T: Send + 'a>(&'a self) -> BoxFuture<'a, CacheResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::pending())
    }
}

impl CacheStore for HangingStore {
    fn ping(&self) -> BoxFuture<'_, CacheResult<()>> {
        self.hang()
    }

    fn get_many<'a>(&'a self, _keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        self.hang()
    }

    fn set_ex<'a>(
        &'a self,
        _key: &'a str,
        _value: &'a str,
        _ttl: Duration,
    ) -> BoxFuture<'a, CacheResult<()>> {
        self.hang()
    }

    fn delete<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        self.hang()
    }

    fn delete_prefix<'a>(&'a self, _prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        self.hang()
    }

    fn count_prefix<'a>(&'a self, _prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        self.hang()
    }

    fn info(&self) -> BoxFuture<'_, CacheResult<StoreInfo>> {
        self.hang()
    }

    fn backend_name(&self) -> &'static str {
        "hanging"
    }
}
