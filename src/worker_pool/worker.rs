//! The session boundary: what the pool needs from a fetch worker.

use std::time::Duration;

use futures::future::BoxFuture;

use super::errors::FetchError;

/// One heavyweight, stateful fetch session.
///
/// Lifecycle is init-once (via [`WorkerFactory`]), fetch-many, close-once.
/// `fetch` takes `&mut self`: the pool hands a worker to exactly one caller
/// at a time, and the signature makes that exclusivity a type-level fact.
pub trait Worker: Send {
    /// Load `url` and return its extracted text.
    ///
    /// `timeout` bounds navigation; callers still wrap the whole call in
    /// their own timeout.
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        instruction: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, FetchError>>;

    /// Release the underlying session
    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Creates workers at pool start and when a session has to be replaced
pub trait WorkerFactory: Send + Sync {
    fn create(&self, id: u64) -> BoxFuture<'_, anyhow::Result<Box<dyn Worker>>>;

    /// Backend name for logs
    fn kind(&self) -> &'static str;
}
