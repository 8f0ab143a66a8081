//! Terminal sink for `vdq run`: one line per active job.

use async_trait::async_trait;
use vdq_core::job::{ProgressSnapshot, Recipient};
use vdq_core::scheduler::ProgressStatus;
use vdq_core::sink::{ErrorSink, ProgressSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

pub fn format_line(s: &ProgressSnapshot) -> String {
    let name = match &s.series_name {
        Some(series) => format!("{series}/{}", s.file_name),
        None => s.file_name.clone(),
    };
    format!(
        "  [{}] {}: {} / {} ({}%)  {}  ETA {}",
        s.id, name, s.progress, s.total, s.percentage, s.speed, s.time_left
    )
}

#[async_trait]
impl ProgressSink for TerminalSink {
    async fn update(&self, _recipient: &Recipient, status: Option<&ProgressStatus>) {
        match status {
            None => println!("  queue idle"),
            Some(ProgressStatus::Single(s)) => println!("{}", format_line(s)),
            Some(ProgressStatus::Multiple { queue, downloading }) => {
                for s in downloading {
                    println!("{}", format_line(s));
                }
                if !queue.is_empty() {
                    println!("  {} queued", queue.len());
                }
            }
        }
    }
}

#[async_trait]
impl ErrorSink for TerminalSink {
    async fn send_error(&self, recipient: &Recipient, message: &str) {
        tracing::warn!(%recipient, "{}", message);
        eprintln!("vdq: {message}");
    }
}
