use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ChannelId;

/// One async mutex per channel, created on first use and kept for the life of
/// the process.
///
/// Entries are never removed: dropping a lock while a task still waits on it
/// and recreating it later would leave two independent locks for one channel.
#[derive(Debug, Default)]
pub struct ChannelLocks {
    inner: Mutex<HashMap<ChannelId, Arc<Mutex<()>>>>,
}

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `channel_id`, installing it if this is the first access.
    ///
    /// The registry mutex is held only for the lookup-or-insert, never while
    /// the channel lock itself is awaited.
    pub async fn lock_for(&self, channel_id: ChannelId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        map.entry(channel_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `channel_id`. Released when the guard drops.
    pub async fn lock(&self, channel_id: ChannelId) -> OwnedMutexGuard<()> {
        let lock = self.lock_for(channel_id).await;
        lock.lock_owned().await
    }

    /// Non-blocking variant of [`ChannelLocks::lock`].
    pub async fn try_lock(&self, channel_id: ChannelId) -> Option<OwnedMutexGuard<()>> {
        let lock = self.lock_for(channel_id).await;
        lock.try_lock_owned().ok()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_channel_gets_the_same_lock() {
        let locks = ChannelLocks::new();
        let a = locks.lock_for(ChannelId(1)).await;
        let b = locks.lock_for(ChannelId(1)).await;
        let c = locks.lock_for(ChannelId(2)).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_installs_one_lock() {
        let locks = Arc::new(ChannelLocks::new());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let locks = locks.clone();
            tasks.push(tokio::spawn(
                async move { locks.lock_for(ChannelId(99)).await },
            ));
        }

        let mut seen = Vec::new();
        for t in tasks {
            seen.push(t.await.unwrap());
        }

        assert!(seen.iter().all(|l| Arc::ptr_eq(l, &seen[0])));
        assert_eq!(locks.len().await, 1);
    }

    #[tokio::test]
    async fn holding_a_channel_blocks_only_that_channel() {
        let locks = ChannelLocks::new();
        let guard = locks.lock(ChannelId(1)).await;

        assert!(locks.try_lock(ChannelId(1)).await.is_none());
        assert!(locks.try_lock(ChannelId(2)).await.is_some());

        drop(guard);
        assert!(locks.try_lock(ChannelId(1)).await.is_some());
    }
}
