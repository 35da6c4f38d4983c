//! The key/value boundary the cache manager talks to.

use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};

use super::errors::CacheResult;

/// Backend facts reported by `INFO` (or its in-memory equivalent)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreInfo {
    pub memory_used: Option<String>,
    pub backend_version: Option<String>,
}

/// A shared key/value store with per-entry expiry.
///
/// Values are opaque strings; the manager owns the encoding. Implementations
/// must treat an expired entry as absent even if it has not been evicted yet.
pub trait CacheStore: Send + Sync {
    /// Cheap reachability probe
    fn ping(&self) -> BoxFuture<'_, CacheResult<()>>;

    /// Batch read in one round trip. The result has one slot per key, in order.
    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>>;

    fn set_ex<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration)
    -> BoxFuture<'a, CacheResult<()>>;

    /// Returns whether the key existed
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>>;

    /// Delete every key starting with `prefix`, returning how many went
    fn delete_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>>;

    fn count_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>>;

    fn info(&self) -> BoxFuture<'_, CacheResult<StoreInfo>>;

    /// Human-readable backend name for logs and stats
    fn backend_name(&self) -> &'static str;

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<Option<String>>> {
        Box::pin(async move {
            let keys = [key.to_string()];
            Ok(self.get_many(&keys).await?.into_iter().next().flatten())
        })
    }

    /// Batch write where each key succeeds or fails on its own.
    ///
    /// Writes are issued concurrently; the result has one slot per entry.
    fn set_many<'a>(
        &'a self,
        entries: &'a [(String, String)],
        ttl: Duration,
    ) -> BoxFuture<'a, Vec<CacheResult<()>>> {
        Box::pin(async move {
            join_all(
                entries
                    .iter()
                    .map(|(key, value)| self.set_ex(key, value, ttl)),
            )
            .await
        })
    }
}
