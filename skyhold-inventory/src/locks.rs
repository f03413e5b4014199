use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use skyhold_core::PartitionKey;

/// One async mutex per (flight, cabin). Partitions never share a lock.
#[derive(Default)]
pub struct PartitionLocks {
    locks: DashMap<PartitionKey, Arc<Mutex<()>>>,
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: PartitionKey) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is gone before we await.
        let lock = self.locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        // The table's own Arc is the only reference left once every guard is gone.
        // `acquire` clones under the same shard lock `retain` takes, so this cannot
        // race with a new acquirer.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyhold_core::CabinClass;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_distinct_partitions_do_not_block() {
        let locks = PartitionLocks::new();
        let flight = Uuid::new_v4();
        let economy = PartitionKey::new(flight, CabinClass::Economy);
        let business = PartitionKey::new(flight, CabinClass::Business);

        let _held = locks.acquire(economy).await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(business)).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire(economy)).await;
        assert!(same.is_err());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_keeps_locks_in_use() {
        let locks = PartitionLocks::new();
        let busy = PartitionKey::new(Uuid::new_v4(), CabinClass::Economy);
        let idle = PartitionKey::new(Uuid::new_v4(), CabinClass::Economy);

        let held = locks.acquire(busy).await;
        drop(locks.acquire(idle).await);
        assert_eq!(locks.len(), 2);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);

        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire(busy)).await;
        assert!(same.is_err());

        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
