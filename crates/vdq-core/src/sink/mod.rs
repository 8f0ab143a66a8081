//! Where progress and errors go. The scheduler pushes; sinks decide how
//! (and how often) to render.

mod log;
mod throttle;

pub use log::LogSink;
pub use throttle::ThrottledProgressSink;

use async_trait::async_trait;

use crate::job::Recipient;
use crate::scheduler::ProgressStatus;

#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `None` means nothing is active any more for `recipient`.
    async fn update(&self, recipient: &Recipient, status: Option<&ProgressStatus>);
}

#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn send_error(&self, recipient: &Recipient, message: &str);
}
