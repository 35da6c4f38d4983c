//! In-process [`CacheStore`] backed by `DashMap`.
//!
//! Serves single-instance deployments (`REDIS_URL=memory://`) and tests. It
//! can be switched unreachable at runtime to simulate a store outage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use futures::future::BoxFuture;

use super::errors::{CacheError, CacheResult};
use super::store::{CacheStore, StoreInfo};

struct Slot {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
    unreachable: AtomicBool,
    rejected_keys: DashSet<String>,
    operations: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage (`false`) or recovery (`true`)
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Make writes to `key` fail while other keys keep working
    pub fn reject_writes_to(&self, key: impl Into<String>) {
        self.rejected_keys.insert(key.into());
    }

    /// Number of store calls made so far, reachable or not
    #[must_use]
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Live (unexpired) entries
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> CacheResult<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|slot| {
            (slot.expires_at > now).then(|| slot.value.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, slot| slot.expires_at <= now);
        }
        hit
    }

    fn live_keys(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.expires_at > now)
            .map(|e| e.key().clone())
            .collect()
    }
}

impl CacheStore for MemoryStore {
    fn ping(&self) -> BoxFuture<'_, CacheResult<()>> {
        Box::pin(async move { self.check() })
    }

    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        Box::pin(async move {
            self.check()?;
            Ok(keys.iter().map(|k| self.live(k)).collect())
        })
    }

    fn set_ex<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, CacheResult<()>> {
        Box::pin(async move {
            self.check()?;
            if self.rejected_keys.contains(key) {
                return Err(CacheError::Backend(format!("write rejected for {key}")));
            }
            self.entries.insert(
                key.to_string(),
                Slot {
                    value: value.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.entries.remove(key).is_some())
        })
    }

    fn delete_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        Box::pin(async move {
            self.check()?;
            let keys = self.live_keys(prefix);
            let removed = keys
                .iter()
                .filter(|k| self.entries.remove(k.as_str()).is_some())
                .count();
            Ok(removed as u64)
        })
    }

    fn count_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.live_keys(prefix).len() as u64)
        })
    }

    fn info(&self) -> BoxFuture<'_, CacheResult<StoreInfo>> {
        Box::pin(async move {
            self.check()?;
            let bytes: usize = self
                .entries
                .iter()
                .map(|e| e.key().len() + e.value.len())
                .sum();
            Ok(StoreInfo {
                memory_used: Some(format!("{:.2}K", bytes as f64 / 1024.0)),
                backend_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            })
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
