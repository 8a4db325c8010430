//! Magazine Cache - Namespaced key-value cache for the magazine admin backend
//!
//! JSON values over Redis, with prefix invalidation and explicit lifecycle.

pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{CacheStats, KeyValueCache};
pub use config::{Backend, Config};
pub use error::{CacheError, Result};
pub use store::{KvStore, MemoryStore, RedisStore};
pub use tasks::spawn_purge_task;
