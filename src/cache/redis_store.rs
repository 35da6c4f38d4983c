//! Redis-backed [`CacheStore`].
//!
//! Uses a lazily-established `ConnectionManager`, so a Redis server that is
//! down at startup does not prevent the service from booting; the first
//! operation after it comes back reconnects.

use std::time::Duration;

use futures::future::BoxFuture;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::errors::{CacheError, CacheResult};
use super::store::{CacheStore, StoreInfo};

/// Upper bound on establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Keys fetched per SCAN round trip
const SCAN_BATCH: usize = 100;

pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
    response_timeout: Duration,
}

impl RedisStore {
    /// Validate the URL. Does not connect.
    ///
    /// `response_timeout` bounds every command on the connection.
    pub fn new(redis_url: &str, response_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            response_timeout,
        })
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECT_TIMEOUT)
            .set_response_timeout(self.response_timeout);
        let connect = ConnectionManager::new_with_config(self.client.clone(), config);
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| CacheError::Unavailable("timed out connecting to redis".into()))??;
        info!("Connected to redis cache store");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern.as_str())
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            found.extend(keys);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(found)
    }
}

impl CacheStore for RedisStore {
    fn ping(&self) -> BoxFuture<'_, CacheResult<()>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
    }

    fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            let mut conn = self.connection().await?;
            let mut cmd = redis::cmd("MGET");
            for key in keys {
                cmd.arg(key.as_str());
            }
            let values: Vec<Option<String>> = cmd.query_async(&mut conn).await?;
            Ok(values)
        })
    }

    fn set_ex<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> BoxFuture<'a, CacheResult<()>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            // EX 0 is rejected by redis
            let secs = ttl.as_secs().max(1);
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(removed > 0)
        })
    }

    fn delete_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        Box::pin(async move {
            let keys = self.scan_prefix(prefix).await?;
            let mut conn = self.connection().await?;
            let mut removed = 0u64;
            for chunk in keys.chunks(SCAN_BATCH) {
                let mut cmd = redis::cmd("DEL");
                for key in chunk {
                    cmd.arg(key.as_str());
                }
                let n: u64 = cmd.query_async(&mut conn).await?;
                removed += n;
            }
            debug!(prefix, removed, "Deleted keys by prefix");
            Ok(removed)
        })
    }

    fn count_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        Box::pin(async move { Ok(self.scan_prefix(prefix).await?.len() as u64) })
    }

    fn info(&self) -> BoxFuture<'_, CacheResult<StoreInfo>> {
        Box::pin(async move {
            let mut conn = self.connection().await?;
            let raw: String = redis::cmd("INFO").query_async(&mut conn).await?;
            Ok(parse_info(&raw))
        })
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Pull the fields we report out of an `INFO` reply
fn parse_info(raw: &str) -> StoreInfo {
    let mut info = StoreInfo::default();
    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("used_memory_human:") {
            info.memory_used = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("redis_version:") {
            info.backend_version = Some(v.trim().to_string());
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_reply() {
        let raw = "# Server\r\nredis_version:7.2.4\r\nos:Linux\r\n# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        let info = parse_info(raw);
        assert_eq!(info.backend_version.as_deref(), Some("7.2.4"));
        assert_eq!(info.memory_used.as_deref(), Some("1.00M"));
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(RedisStore::new("not-a-url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires a running redis server on localhost:6379
    async fn round_trip_against_local_redis() {
        let store = RedisStore::new("redis://127.0.0.1:6379/15", Duration::from_secs(1)).unwrap();
        store.ping().await.unwrap();
        store
            .set_ex("searcrawl_test:a", "value", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(
            store.get("searcrawl_test:a").await.unwrap().as_deref(),
            Some("value")
        );
        assert_eq!(store.delete_prefix("searcrawl_test:").await.unwrap(), 1);
    }
}
