//! In-process Store Module
//!
//! HashMap-backed store for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::entry::{current_timestamp_ms, StoredEntry};
use super::KvStore;
use crate::error::{CacheError, Result};

// == Op Counts ==
/// Number of calls made against the store, by command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub gets: u64,
    pub sets: u64,
    pub deletes: u64,
    pub scans: u64,
    pub pings: u64,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    pings: AtomicU64,
}

// == Memory Store ==
/// In-process key-value store with optional per-entry expiry.
///
/// Expired entries are never returned; they are dropped by `purge_expired`.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    counters: Counters,
    available: AtomicBool,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulates the store going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of the per-command call counters.
    pub fn op_counts(&self) -> OpCounts {
        OpCounts {
            gets: self.counters.gets.load(Ordering::Relaxed),
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            scans: self.counters.scans.load(Ordering::Relaxed),
            pings: self.counters.pings.load(Ordering::Relaxed),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired_at(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    fn check_available(&self, counter: &AtomicU64) -> Result<()> {
        counter.fetch_add(1, Ordering::Relaxed);
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable(
                "connection closed".to_string(),
            ));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available(&self.counters.gets)?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.check_available(&self.counters.sets)?;
        let entry = StoredEntry::new(value.to_string(), ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.check_available(&self.counters.deletes)?;
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired_at(now))
            .count();
        Ok(removed as u64)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_available(&self.counters.scans)?;
        let now = current_timestamp_ms();
        let entries = self.entries.read().await;
        let keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        debug!(prefix, matched = keys.len(), "memory scan");
        Ok(keys)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available(&self.counters.pings)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.entries.write().await.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("k", "\"v\"", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("\"v\""));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_counts_existing_only() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.unwrap();

        let removed = store
            .delete(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_scan_prefix_is_literal() {
        let store = MemoryStore::new();
        store.set("a*:1", "1", None).await.unwrap();
        store.set("ab:1", "1", None).await.unwrap();

        let keys = store.scan_prefix("a*").await.unwrap();
        assert_eq!(keys, vec!["a*:1".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_entries_are_hidden_and_purged() {
        let store = MemoryStore::new();
        store
            .set("short", "1", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.set("long", "1", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.get("short").await.unwrap().is_none());
        assert_eq!(store.scan_prefix("").await.unwrap(), vec!["long".to_string()]);
        assert_eq!(store.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(store.get("k").await, Err(CacheError::StoreUnavailable(_))));
        assert!(matches!(
            store.set("k", "1", None).await,
            Err(CacheError::StoreUnavailable(_))
        ));
        assert!(matches!(store.ping().await, Err(CacheError::StoreUnavailable(_))));

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_final() {
        let store = MemoryStore::new();
        store.set("k", "1", None).await.unwrap();
        store.close().await;

        store.set_available(true);
        assert!(matches!(store.get("k").await, Err(CacheError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_op_counts() {
        let store = MemoryStore::new();
        store.set("k", "1", None).await.unwrap();
        store.get("k").await.unwrap();
        store.scan_prefix("k").await.unwrap();

        let counts = store.op_counts();
        assert_eq!(counts.sets, 1);
        assert_eq!(counts.gets, 1);
        assert_eq!(counts.scans, 1);
        assert_eq!(counts.deletes, 0);
    }
}
