//! Fixed-size pool of long-lived fetch workers
//!
//! At most `capacity` fetches run at once across the whole process, however
//! many requests are in flight. Callers that cannot get a worker within
//! their timeout get [`PoolError::Exhausted`], the admission-control signal.

pub mod errors;
pub mod pool;
pub mod worker;

pub use errors::{FetchError, PoolError};
pub use pool::{PoolStats, PooledWorker, WorkerGuard, WorkerPool};
pub use worker::{Worker, WorkerFactory};
