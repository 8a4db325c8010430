//! Key-Value Cache Façade
//!
//! JSON-valued cache over an injected `KvStore`, scoped to one namespace.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, KeySpace};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::KvStore;

// == Key-Value Cache ==
/// Best-effort acceleration layer in front of the canonical document store.
///
/// Cloning is cheap; clones share the store handle and the statistics.
/// Errors from the store are returned as-is: nothing here retries.
#[derive(Clone)]
pub struct KeyValueCache {
    store: Arc<dyn KvStore>,
    keys: KeySpace,
    default_ttl: Option<Duration>,
    stats: Arc<StatsRecorder>,
}

impl KeyValueCache {
    // == Constructors ==
    /// Creates a cache over `store` confined to `namespace`.
    ///
    /// Entries written with `set` never expire.
    pub fn new(store: Arc<dyn KvStore>, namespace: &str) -> Result<Self> {
        Ok(Self {
            store,
            keys: KeySpace::new(namespace)?,
            default_ttl: None,
            stats: Arc::new(StatsRecorder::default()),
        })
    }

    /// Creates a cache using the namespace and default TTL from `config`.
    pub fn from_config(store: Arc<dyn KvStore>, config: &Config) -> Result<Self> {
        Ok(Self::new(store, &config.namespace)?.with_default_ttl(config.default_ttl()))
    }

    /// Sets the expiration applied by `set`. None disables expiration.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    // == Set ==
    /// Stores `value` as JSON under `key`, replacing any prior value.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.write(key, value, self.default_ttl).await
    }

    /// Stores `value` under `key`, expiring after `ttl`.
    ///
    /// The TTL must be non-zero and fit in `u64` milliseconds.
    pub async fn set_with_ttl<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.write(key, value, Some(ttl)).await
    }

    async fn write<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if let Some(ttl) = ttl {
            check_ttl(key, ttl)?;
        }
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set(&self.keys.qualify(key), &payload, ttl).await?;
        self.stats.record_write();
        Ok(())
    }

    // == Get ==
    /// Reads and decodes the value under `key`.
    ///
    /// A payload that does not decode as `T` is logged and reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_strict(key).await {
            Err(CacheError::Deserialization { key, message }) => {
                self.stats.record_decode_failure();
                self.stats.record_miss();
                warn!(%key, %message, "discarding undecodable cache entry");
                Ok(None)
            }
            other => other,
        }
    }

    /// Like `get`, but returns `Deserialization` for undecodable payloads.
    pub async fn get_strict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.keys.qualify(key);
        let Some(raw) = self.store.get(&full_key).await? else {
            self.stats.record_miss();
            return Ok(None);
        };

        let value = serde_json::from_str(&raw).map_err(|e| CacheError::Deserialization {
            key: full_key,
            message: e.to_string(),
        })?;
        self.stats.record_hit();
        Ok(Some(value))
    }

    // == Get Or Load ==
    /// Cache-aside read: returns the cached value or calls `loader` and caches
    /// its result.
    ///
    /// The cache is advisory here. A failed read counts as a miss and a failed
    /// write-back is only logged; only `loader` errors reach the caller.
    pub async fn get_or_load<T, F, Fut, E>(&self, key: &str, loader: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) => warn!(key, error = %err, "cache read failed, loading from source"),
        }

        let value = loader().await?;
        if let Err(err) = self.set(key, &value).await {
            warn!(key, error = %err, "cache write-back failed");
        }
        Ok(value)
    }

    // == Delete ==
    /// Removes `key`. Removing an absent key is not an error.
    pub async fn del(&self, key: &str) -> Result<()> {
        let removed = self.store.delete(&[self.keys.qualify(key)]).await?;
        debug!(key, removed, "cache delete");
        Ok(())
    }

    // == Prefix Delete ==
    /// Removes every key in the namespace starting with `prefix`.
    ///
    /// Scans first, then issues one bulk delete if anything matched. Keys
    /// written between the two steps may survive. Returns the number of keys
    /// the store reported removed.
    pub async fn clear_keys_by_prefix(&self, prefix: &str) -> Result<u64> {
        let matched = self.store.scan_prefix(&self.keys.prefix(prefix)).await?;
        if matched.is_empty() {
            debug!(prefix, "no keys matched prefix");
            return Ok(0);
        }

        let removed = self.store.delete(&matched).await?;
        self.stats.record_invalidated(removed);
        info!(
            namespace = self.namespace(),
            prefix,
            matched = matched.len(),
            removed,
            "invalidated cache prefix"
        );
        Ok(removed)
    }

    // == Clear ==
    /// Removes every key in this cache's namespace.
    ///
    /// Other namespaces sharing the store are untouched. There is no undo.
    pub async fn clear(&self) -> Result<()> {
        self.clear_keys_by_prefix("").await?;
        Ok(())
    }

    // == Keys ==
    /// Lists every key in the namespace, sorted, without the namespace.
    ///
    /// The result is unbounded; use for diagnostics only.
    pub async fn get_all_keys(&self) -> Result<Vec<String>> {
        let full_keys = self.store.scan_prefix(&self.keys.prefix("")).await?;
        let mut keys: Vec<String> = full_keys
            .iter()
            .filter_map(|full| self.keys.strip(full))
            .map(str::to_string)
            .collect();
        keys.sort();
        Ok(keys)
    }

    // == Lifecycle ==
    /// Checks that the store answers.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Closes the underlying store connection for every clone of this cache.
    pub async fn close(&self) {
        self.store.close().await;
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// Rejects TTLs the stores cannot represent as milliseconds.
fn check_ttl(key: &str, ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidInput(format!(
            "TTL for key '{key}' must be greater than zero"
        )));
    }
    if u64::try_from(ttl.as_millis()).is_err() {
        return Err(CacheError::InvalidInput(format!(
            "TTL for key '{key}' is too large ({}s)",
            ttl.as_secs()
        )));
    }
    Ok(())
}
