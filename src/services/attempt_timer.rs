use std::{collections::HashMap, future::Future, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle};

/// One pending expiry task per open timed attempt.
#[derive(Default)]
pub struct AttemptTimers {
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl AttemptTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `on_expiry` after `delay` unless a live timer already exists.
    pub async fn arm<F>(&self, attempt_id: &str, delay: Duration, on_expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.handles.lock().await;
        if handles
            .get(attempt_id)
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }

        log::debug!("Arming expiry timer for attempt {} in {:?}", attempt_id, delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_expiry.await;
        });
        handles.insert(attempt_id.to_string(), handle);
    }

    /// Aborts the pending expiry task, if any.
    pub async fn cancel(&self, attempt_id: &str) {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.remove(attempt_id) {
            handle.abort();
            log::debug!("Cancelled expiry timer for attempt {}", attempt_id);
        }
    }

    /// Removes the entry without aborting; used by the expiry task itself.
    pub async fn forget(&self, attempt_id: &str) {
        self.handles.lock().await.remove(attempt_id);
    }

    pub async fn is_armed(&self, attempt_id: &str) -> bool {
        self.handles
            .lock()
            .await
            .get(attempt_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}
