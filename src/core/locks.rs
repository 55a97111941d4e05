//! Per-deal mutual exclusion.
//!
//! Button presses and the sweep run as independent tasks. Every transition holds the
//! deal's lock from the moment it reads the deal until its writes are committed.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per deal id
#[derive(Debug, Default)]
pub struct DealLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DealLocks {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `deal_id`; released when the guard drops.
    pub async fn lock(&self, deal_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on are dropped.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(deal_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of deals currently locked or waited on
    pub async fn active(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_deal_is_serialized() {
        let locks = Arc::new(DealLocks::new());
        let guard = locks.lock("deal-1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("deal-1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        let joined = tokio::time::timeout(Duration::from_secs(1), contender).await;
        assert!(matches!(joined, Ok(Ok(()))), "contender never acquired the lock");
    }

    #[tokio::test]
    async fn test_different_deals_do_not_block() {
        let locks = DealLocks::new();
        let _first = locks.lock("deal-1").await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock("deal-2")).await;
        assert!(second.is_ok());
        assert_eq!(locks.active().await, 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = DealLocks::new();
        drop(locks.lock("deal-1").await);
        let _other = locks.lock("deal-2").await;
        assert_eq!(locks.active().await, 1);
    }
}
