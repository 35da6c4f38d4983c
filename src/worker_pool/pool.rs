//! Fixed-capacity worker pool with FIFO admission
//!
//! Capacity is enforced by a `tokio::sync::Semaphore` holding one permit per
//! live worker. The idle set is a plain mutex-protected queue. A permit is
//! only ever returned after its worker is back in the queue, so a caller
//! holding a permit always finds a worker to pop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use super::errors::{FetchError, PoolError};
use super::worker::{Worker, WorkerFactory};

/// Attempts made to replace a worker whose session was lost
const REPLACE_ATTEMPTS: u32 = 3;

/// Base delay between replacement attempts (doubled each time)
const REPLACE_BACKOFF: Duration = Duration::from_millis(500);

// =============================================================================
// Pooled Worker Instance
// =============================================================================

/// A worker with pool metadata
pub struct PooledWorker {
    /// Unique identifier for this worker instance
    pub id: u64,
    worker: Box<dyn Worker>,
    /// Completed fetch calls on this worker
    pub fetches: u64,
}

impl PooledWorker {
    fn new(id: u64, worker: Box<dyn Worker>) -> Self {
        Self {
            id,
            worker,
            fetches: 0,
        }
    }
}

/// Point-in-time occupancy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStats {
    /// Live workers (configured size minus any that could not be replaced)
    pub capacity: usize,
    pub available: usize,
    pub in_use: usize,
    pub shutting_down: bool,
}

// =============================================================================
// Worker Pool
// =============================================================================

pub struct WorkerPool {
    factory: Arc<dyn WorkerFactory>,
    /// Idle workers, FIFO so load spreads across sessions
    idle: Mutex<VecDeque<PooledWorker>>,
    permits: Arc<Semaphore>,
    live: AtomicUsize,
    in_use: AtomicUsize,
    next_id: AtomicU64,
    shutting_down: AtomicBool,
}

impl WorkerPool {
    /// Launch `size` workers concurrently and open the pool.
    ///
    /// All workers exist before this returns; if any launch fails the ones
    /// that succeeded are closed and the pool is not created.
    pub async fn start(factory: Arc<dyn WorkerFactory>, size: usize) -> Result<Arc<Self>, PoolError> {
        if size == 0 {
            return Err(PoolError::Launch("pool size must be at least 1".into()));
        }
        info!(size, backend = factory.kind(), "Starting worker pool");

        let launched = join_all((0..size as u64).map(|id| factory.create(id))).await;

        let mut workers = VecDeque::with_capacity(size);
        let mut first_error = None;
        for (id, result) in (0..size as u64).zip(launched) {
            match result {
                Ok(worker) => workers.push_back(PooledWorker::new(id, worker)),
                Err(e) => {
                    let reason = format!("{e:#}");
                    error!(worker_id = id, error = %reason, "Failed to launch worker");
                    first_error.get_or_insert(reason);
                }
            }
        }

        if let Some(reason) = first_error {
            join_all(workers.into_iter().map(|w| w.worker.close())).await;
            return Err(PoolError::Launch(reason));
        }

        info!(size, "Worker pool ready");
        Ok(Arc::new(Self {
            factory,
            idle: Mutex::new(workers),
            permits: Arc::new(Semaphore::new(size)),
            live: AtomicUsize::new(size),
            in_use: AtomicUsize::new(0),
            next_id: AtomicU64::new(size as u64),
            shutting_down: AtomicBool::new(false),
        }))
    }

    /// Wait up to `timeout` for a free worker.
    ///
    /// Waiters are served in arrival order. The returned guard gives the
    /// worker back when dropped, on every exit path.
    pub async fn acquire(self: &Arc<Self>, timeout: Duration) -> Result<WorkerGuard, PoolError> {
        if self.is_shutting_down() {
            return Err(PoolError::ShutDown);
        }

        let started = Instant::now();
        let permit = match tokio::time::timeout(timeout, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => return Err(PoolError::ShutDown),
            Err(_elapsed) => {
                let waited = started.elapsed();
                warn!(?waited, "Worker pool exhausted");
                return Err(PoolError::Exhausted { waited });
            }
        };

        if self.is_shutting_down() {
            return Err(PoolError::ShutDown);
        }

        // Holding a permit means a worker is queued, unless shutdown drained it
        let Some(worker) = self.idle.lock().pop_front() else {
            return Err(PoolError::ShutDown);
        };

        self.in_use.fetch_add(1, Ordering::AcqRel);
        debug!(
            worker_id = worker.id,
            waited_ms = started.elapsed().as_millis() as u64,
            "Acquired worker"
        );

        Ok(WorkerGuard {
            worker: Some(worker),
            permit: Some(permit),
            pool: Arc::clone(self),
            broken: false,
        })
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.live.load(Ordering::Acquire),
            available: self.idle.lock().len(),
            in_use: self.in_use.load(Ordering::Acquire),
            shutting_down: self.is_shutting_down(),
        }
    }

    /// Name of the backend the workers come from
    #[must_use]
    pub fn backend_kind(&self) -> &'static str {
        self.factory.kind()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Stop accepting acquisitions, wait up to `drain` for checked-out
    /// workers to come back, then close every session.
    ///
    /// Workers still checked out when the drain times out are closed by
    /// their guard on release. Calling this again is a no-op.
    pub async fn shutdown(&self, drain: Duration) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(in_use = self.in_use.load(Ordering::Acquire), "Shutting down worker pool");

        let live = u32::try_from(self.live.load(Ordering::SeqCst)).unwrap_or(u32::MAX);
        match tokio::time::timeout(drain, self.permits.acquire_many(live)).await {
            Ok(Ok(all)) => {
                debug!("All workers returned before shutdown");
                all.forget();
            }
            Ok(Err(_)) => {}
            Err(_) => warn!(
                ?drain,
                still_in_use = self.in_use.load(Ordering::Acquire),
                "Drain timed out, closing idle workers now"
            ),
        }
        self.permits.close();

        let workers: Vec<PooledWorker> = self.idle.lock().drain(..).collect();
        let closed = workers.len();
        join_all(workers.into_iter().map(|w| w.worker.close())).await;
        info!(closed, "Worker pool shutdown complete");
    }

    /// Return a healthy worker to the idle queue, then its permit
    fn release(&self, worker: PooledWorker, permit: OwnedSemaphorePermit) {
        debug!(worker_id = worker.id, fetches = worker.fetches, "Released worker");
        self.idle.lock().push_back(worker);
        drop(permit);
    }

    /// Swap a worker whose session died for a fresh one.
    ///
    /// The permit stays held until the replacement is queued, so capacity
    /// never over-reports. If every attempt fails the slot is retired.
    fn replace(self: Arc<Self>, broken: PooledWorker, permit: OwnedSemaphorePermit) {
        let spawned = spawn_detached(async move {
            warn!(worker_id = broken.id, "Replacing worker with lost session");
            broken.worker.close().await;

            let mut delay = REPLACE_BACKOFF;
            for attempt in 1..=REPLACE_ATTEMPTS {
                if self.is_shutting_down() {
                    break;
                }
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                match self.factory.create(id).await {
                    Ok(worker) => {
                        if self.is_shutting_down() {
                            worker.close().await;
                            break;
                        }
                        info!(worker_id = id, attempt, "Replacement worker ready");
                        self.release(PooledWorker::new(id, worker), permit);
                        return;
                    }
                    Err(e) => {
                        let reason = format!("{e:#}");
                        warn!(attempt, error = %reason, "Replacement launch failed");
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }

            // Retire the slot first, then look at the shutdown flag. A shutdown
            // that read `live` before the decrement is still waiting for this
            // permit, so it must be returned rather than forgotten.
            let remaining = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
            if self.shutting_down.load(Ordering::SeqCst) {
                drop(permit);
                return;
            }
            error!(remaining, "Could not replace worker, pool capacity reduced");
            permit.forget();
        });
        if !spawned {
            error!("No runtime available to replace worker, pool capacity reduced");
        }
    }
}

/// Spawn onto the current runtime if there is one
fn spawn_detached<F>(fut: F) -> bool
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
            true
        }
        Err(_) => false,
    }
}

// =============================================================================
// RAII Guard
// =============================================================================

/// Exclusive use of one pooled worker.
///
/// Dropping the guard releases the worker: back to the idle queue when
/// healthy, to a background replacement when its session was lost, or to
/// `close` once shutdown has begun.
pub struct WorkerGuard {
    worker: Option<PooledWorker>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<WorkerPool>,
    broken: bool,
}

impl WorkerGuard {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.worker.as_ref().map_or(u64::MAX, |w| w.id)
    }

    /// Run one fetch on this worker.
    ///
    /// A [`FetchError::SessionLost`] marks the worker for replacement.
    pub async fn fetch(
        &mut self,
        url: &str,
        instruction: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let Some(pooled) = self.worker.as_mut() else {
            return Err(FetchError::SessionLost("worker already released".into()));
        };
        let result = pooled.worker.fetch(url, instruction, timeout).await;
        pooled.fetches += 1;
        if matches!(result, Err(FetchError::SessionLost(_))) {
            self.broken = true;
        }
        result
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let (Some(worker), Some(permit)) = (self.worker.take(), self.permit.take()) else {
            return;
        };
        self.pool.in_use.fetch_sub(1, Ordering::AcqRel);

        if self.pool.is_shutting_down() {
            debug!(worker_id = worker.id, "Closing worker released after shutdown");
            drop(permit);
            if !spawn_detached(worker.worker.close()) {
                warn!("No runtime available to close worker session");
            }
        } else if self.broken {
            Arc::clone(&self.pool).replace(worker, permit);
        } else {
            self.pool.release(worker, permit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;

    struct EchoWorker {
        closed: Arc<AtomicUsize>,
    }

    impl Worker for EchoWorker {
        fn fetch<'a>(
            &'a mut self,
            url: &'a str,
            _instruction: &'a str,
            _timeout: Duration,
        ) -> BoxFuture<'a, Result<String, FetchError>> {
            Box::pin(async move {
                if url.contains("dead") {
                    Err(FetchError::SessionLost("target crashed".into()))
                } else {
                    Ok(format!("content of {url}"))
                }
            })
        }

        fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
            Box::pin(async move {
                self.closed.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    struct EchoFactory {
        created: AtomicUsize,
        closed: Arc<AtomicUsize>,
        fail_from: Option<usize>,
    }

    impl EchoFactory {
        fn new() -> Self {
            Self {
                created: AtomicUsize::new(0),
                closed: Arc::new(AtomicUsize::new(0)),
                fail_from: None,
            }
        }
    }

    impl WorkerFactory for EchoFactory {
        fn create(&self, _id: u64) -> BoxFuture<'_, anyhow::Result<Box<dyn Worker>>> {
            Box::pin(async move {
                let n = self.created.fetch_add(1, Ordering::SeqCst);
                if self.fail_from.is_some_and(|limit| n >= limit) {
                    anyhow::bail!("launch refused");
                }
                Ok(Box::new(EchoWorker {
                    closed: Arc::clone(&self.closed),
                }) as Box<dyn Worker>)
            })
        }

        fn kind(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn start_launches_every_worker_eagerly() {
        let factory = Arc::new(EchoFactory::new());
        let pool = WorkerPool::start(factory.clone(), 3).await.unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 3);
        assert_eq!(
            pool.stats(),
            PoolStats {
                capacity: 3,
                available: 3,
                in_use: 0,
                shutting_down: false
            }
        );
    }

    #[tokio::test]
    async fn failed_launch_closes_the_rest() {
        let factory = Arc::new(EchoFactory {
            fail_from: Some(2),
            ..EchoFactory::new()
        });
        let err = WorkerPool::start(factory.clone(), 3).await.err().unwrap();
        assert!(matches!(err, PoolError::Launch(_)));
        assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn guard_returns_worker_on_drop() {
        let pool = WorkerPool::start(Arc::new(EchoFactory::new()), 1).await.unwrap();
        {
            let mut guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
            assert_eq!(pool.stats().in_use, 1);
            let text = guard
                .fetch("https://a.example/", "", Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(text, "content of https://a.example/");
        }
        assert_eq!(pool.stats().available, 1);
        assert_eq!(pool.stats().in_use, 0);
    }

    #[tokio::test]
    async fn acquire_times_out_as_exhausted() {
        let pool = WorkerPool::start(Arc::new(EchoFactory::new()), 1).await.unwrap();
        let _held = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let err = pool.acquire(Duration::from_millis(30)).await.err().unwrap();
        assert!(matches!(err, PoolError::Exhausted { waited } if waited >= Duration::from_millis(30)));
    }

    #[tokio::test]
    async fn lost_session_is_replaced() {
        let factory = Arc::new(EchoFactory::new());
        let pool = WorkerPool::start(factory.clone(), 1).await.unwrap();
        {
            let mut guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
            let err = guard
                .fetch("https://dead.example/", "", Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::SessionLost(_)));
        }
        let guard = pool.acquire(Duration::from_secs(2)).await.unwrap();
        assert_eq!(guard.id(), 1, "replacement worker gets a fresh id");
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_acquires_and_is_idempotent() {
        let factory = Arc::new(EchoFactory::new());
        let pool = WorkerPool::start(factory.clone(), 2).await.unwrap();
        pool.shutdown(Duration::from_millis(100)).await;
        pool.shutdown(Duration::from_millis(100)).await;
        assert!(matches!(
            pool.acquire(Duration::from_millis(10)).await,
            Err(PoolError::ShutDown)
        ));
        assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_is_not_stalled_by_a_failing_replacement() {
        let factory = Arc::new(EchoFactory {
            fail_from: Some(2),
            ..EchoFactory::new()
        });
        let pool = WorkerPool::start(factory.clone(), 2).await.unwrap();
        {
            let mut guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
            let _ = guard
                .fetch("https://dead.example/", "", Duration::from_secs(1))
                .await;
        }
        // Replacement is now failing and backing off while holding its permit
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        pool.shutdown(Duration::from_secs(10)).await;
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "drain waited {:?}",
            started.elapsed()
        );
        assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn worker_released_after_shutdown_is_closed() {
        let factory = Arc::new(EchoFactory::new());
        let pool = WorkerPool::start(factory.clone(), 1).await.unwrap();
        let guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
        pool.shutdown(Duration::from_millis(20)).await;
        assert_eq!(factory.closed.load(Ordering::SeqCst), 0);
        drop(guard);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
    }
}
