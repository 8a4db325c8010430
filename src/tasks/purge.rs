//! Expiry Purge Task
//!
//! Background task that periodically drops expired entries from a
//! `MemoryStore`. Redis expires keys itself and needs no sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a task that purges expired entries every `interval_secs` seconds.
///
/// The task runs until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let purge_handle = spawn_purge_task(store.clone(), 60);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task(store: Arc<MemoryStore>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry purge task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired().await;
            if removed > 0 {
                info!("Expiry purge: removed {} entries", removed);
            } else {
                debug!("Expiry purge: nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvStore;

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("magazine:expire_soon", "1", Some(Duration::from_millis(100)))
            .await
            .unwrap();

        let handle = spawn_purge_task(store.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        // A second purge finds nothing left to remove
        assert_eq!(store.purge_expired().await, 0);
        assert!(store.is_empty().await);

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_live_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("magazine:long_lived", "1", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        store.set("magazine:forever", "1", None).await.unwrap();

        let handle = spawn_purge_task(store.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(
            store.get("magazine:long_lived").await.unwrap().as_deref(),
            Some("1")
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let store = Arc::new(MemoryStore::new());

        let handle = spawn_purge_task(store, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
