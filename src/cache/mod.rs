//! Shared content cache
//!
//! ```text
//! CacheManager                 <- keying, batch ops, outage window
//!   └── Arc<dyn CacheStore>
//!         ├── RedisStore       <- shared across service instances
//!         └── MemoryStore      <- single instance / tests
//! ```
//!
//! Cache unavailability never fails a crawl: reads degrade to misses and
//! writes are skipped.

pub mod errors;
pub mod key;
pub mod manager;
pub mod memory_store;
pub mod redis_store;
pub mod store;

pub use errors::{CacheError, CacheResult};
pub use key::{CRAWL_KEY_PREFIX, CacheKey, SEARCH_KEY_PREFIX};
pub use manager::{CacheEntry, CacheManager, CacheStats, CacheStatus};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{CacheStore, StoreInfo};
