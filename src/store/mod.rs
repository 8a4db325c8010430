//! Store Module
//!
//! Raw string key-value backends the cache façade is built on.

mod entry;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use entry::StoredEntry;
pub use memory::{MemoryStore, OpCounts};
pub use redis_store::RedisStore;

// == Public Constants ==
/// Keys requested per `SCAN` page
pub const SCAN_PAGE_SIZE: usize = 500;

/// A networked (or in-process) key-value store.
///
/// Every method is one logical round trip. Implementations do not retry and
/// do not impose timeouts beyond their client's own.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the raw value for `key`, None if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, replacing any prior value.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Removes all `keys` in a single call. Returns how many existed.
    ///
    /// Callers must not pass an empty slice.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Lists every key starting with `prefix`, matched literally.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Checks that the store answers.
    async fn ping(&self) -> Result<()>;

    /// Releases the connection. Later calls fail with `StoreUnavailable`.
    async fn close(&self);
}
