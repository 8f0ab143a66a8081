use async_trait::async_trait;

use super::{ErrorSink, ProgressSink};
use crate::job::Recipient;
use crate::scheduler::ProgressStatus;

/// Reports through `tracing` only. Used when nothing renders progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn update(&self, recipient: &Recipient, status: Option<&ProgressStatus>) {
        match status {
            None => tracing::debug!(%recipient, "no active downloads"),
            Some(ProgressStatus::Single(s)) => tracing::debug!(
                %recipient,
                job_id = %s.id,
                pct = s.percentage,
                speed = %s.speed,
                eta = %s.time_left,
                "progress"
            ),
            Some(ProgressStatus::Multiple { queue, downloading }) => tracing::debug!(
                %recipient,
                pending = queue.len(),
                in_flight = downloading.len(),
                "progress"
            ),
        }
    }
}

#[async_trait]
impl ErrorSink for LogSink {
    async fn send_error(&self, recipient: &Recipient, message: &str) {
        tracing::warn!(%recipient, "{}", message);
    }
}
