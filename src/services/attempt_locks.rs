use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutexes serializing mutations of one attempt inside this process.
#[derive(Default)]
pub struct AttemptLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AttemptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drops the entry for `key` when nobody holds or waits on it.
    pub async fn prune(&self, key: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
