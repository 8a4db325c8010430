//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Expiry purge: drops expired entries from the in-process store

mod purge;

pub use purge::spawn_purge_task;
