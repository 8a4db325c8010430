//! Redis Store Module
//!
//! Store backend over a multiplexed Redis connection.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::entry::duration_ms;
use super::{KvStore, SCAN_PAGE_SIZE};
use crate::error::{CacheError, Result};

/// Redis-backed store.
///
/// `ConnectionManager` reconnects on its own after a dropped connection and
/// multiplexes commands, so a single handle is shared by every caller.
pub struct RedisStore {
    connection: RwLock<Option<ConnectionManager>>,
    url: String,
}

impl RedisStore {
    /// Opens a client for `url` and establishes the managed connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| {
            CacheError::InvalidInput(format!("Invalid Redis URL '{url}': {e}"))
        })?;
        let connection = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::StoreUnavailable(format!("Failed to connect to Redis at {url}: {e}"))
        })?;
        info!(url, "connected to Redis");

        Ok(Self {
            connection: RwLock::new(Some(connection)),
            url: url.to_string(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::StoreUnavailable("connection closed".to_string()))
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        execute_get(&mut conn, key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        execute_set(&mut conn, key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut conn = self.connection().await?;
        execute_delete(&mut conn, keys).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        execute_scan(&mut conn, &prefix_pattern(prefix), SCAN_PAGE_SIZE).await
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        execute_ping(&mut conn).await
    }

    async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            info!(url = %self.url, "closed Redis connection");
        }
    }
}

// == Command Execution ==

async fn execute_get<C: ConnectionLike>(conn: &mut C, key: &str) -> Result<Option<String>> {
    let value: Option<String> = redis::cmd("GET").arg(key).query_async(conn).await?;
    Ok(value)
}

async fn execute_set<C: ConnectionLike>(
    conn: &mut C,
    key: &str,
    value: &str,
    ttl: Option<Duration>,
) -> Result<()> {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(duration_ms(ttl).max(1));
    }
    let _: () = cmd.query_async(conn).await?;
    Ok(())
}

async fn execute_delete<C: ConnectionLike>(conn: &mut C, keys: &[String]) -> Result<u64> {
    // DEL with no arguments is a syntax error on the server
    if keys.is_empty() {
        return Ok(0);
    }
    let removed: u64 = redis::cmd("DEL").arg(keys).query_async(conn).await?;
    Ok(removed)
}

/// Walks a full `SCAN` cycle for `pattern`.
///
/// `SCAN` may report a key more than once per cycle, so results are deduplicated.
async fn execute_scan<C: ConnectionLike>(
    conn: &mut C,
    pattern: &str,
    page_size: usize,
) -> Result<Vec<String>> {
    let mut keys = BTreeSet::new();
    let mut cursor: u64 = 0;
    let mut pages = 0usize;

    loop {
        let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(page_size)
            .query_async(&mut *conn)
            .await?;
        keys.extend(page);
        pages += 1;
        cursor = next;
        if cursor == 0 {
            break;
        }
    }

    debug!(pattern, pages, matched = keys.len(), "scan complete");
    Ok(keys.into_iter().collect())
}

async fn execute_ping<C: ConnectionLike>(conn: &mut C) -> Result<()> {
    let _: String = redis::cmd("PING").query_async(conn).await?;
    Ok(())
}

// == Glob Patterns ==

/// Builds a `MATCH` pattern selecting keys that start with `prefix` literally.
pub(crate) fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}
