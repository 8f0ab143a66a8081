//! Per-recipient rate limit for progress updates.
//!
//! An update is forwarded when at least `min_interval` has passed since the
//! last forwarded one for that recipient and it differs from it. Clears
//! (`None`) are always forwarded and reset the window.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::ProgressSink;
use crate::job::Recipient;
use crate::scheduler::ProgressStatus;

pub struct ThrottledProgressSink<S> {
    inner: S,
    min_interval: Duration,
    last: Mutex<HashMap<Recipient, (Instant, ProgressStatus)>>,
}

impl<S: ProgressSink> ThrottledProgressSink<S> {
    pub fn new(inner: S, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last: Mutex::new(HashMap::new()),
        }
    }

    fn admit(&self, recipient: &Recipient, status: Option<&ProgressStatus>) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let Some(status) = status else {
            last.remove(recipient);
            return true;
        };
        let now = Instant::now();
        if let Some((at, prev)) = last.get(recipient) {
            if now.duration_since(*at) < self.min_interval || prev == status {
                return false;
            }
        }
        last.insert(recipient.clone(), (now, status.clone()));
        true
    }
}

#[async_trait]
impl<S: ProgressSink> ProgressSink for ThrottledProgressSink<S> {
    async fn update(&self, recipient: &Recipient, status: Option<&ProgressStatus>) {
        if self.admit(recipient, status) {
            self.inner.update(recipient, status).await;
        }
    }
}
