//! `vdq status`: show queued and running jobs.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use vdq_core::config::VdqConfig;
use vdq_core::job::Job;
use vdq_core::scheduler::DownloadQueue;

use super::dispatch;
use crate::cli::control_socket::ControlRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    pub id: String,
    pub name: String,
    pub position: Option<u32>,
    pub percentage: u8,
    pub done: String,
    pub total: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        let snap = job.snapshot_or_placeholder();
        Self {
            id: job.id.clone(),
            name: job.display.file_name.clone(),
            position: job.queue_position,
            percentage: snap.percentage,
            done: snap.progress,
            total: snap.total,
        }
    }
}

/// Queue contents as shown by `vdq status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    pub max_concurrent: usize,
    pub in_flight: Vec<JobRow>,
    pub pending: Vec<JobRow>,
}

impl QueueView {
    pub fn from_queue(queue: &DownloadQueue) -> Self {
        Self {
            max_concurrent: queue.max_concurrent(),
            in_flight: queue.in_flight().iter().map(JobRow::from).collect(),
            pending: queue.pending().iter().map(JobRow::from).collect(),
        }
    }

    pub fn print(&self) {
        if self.in_flight.is_empty() && self.pending.is_empty() {
            println!("No jobs.");
            return;
        }
        println!("{:<8} {:<12} {:<6} {:<22} {}", "ID", "STATE", "PCT", "PROGRESS", "NAME");
        for row in &self.in_flight {
            print_row(row, "running".to_string());
        }
        for row in &self.pending {
            let state = row
                .position
                .map(|p| format!("queued #{p}"))
                .unwrap_or_else(|| "queued".to_string());
            print_row(row, state);
        }
        println!("max concurrent: {}", self.max_concurrent);
    }
}

fn print_row(row: &JobRow, state: String) {
    println!(
        "{:<8} {:<12} {:<6} {:<22} {}",
        row.id,
        state,
        format!("{}%", row.percentage),
        format!("{} / {}", row.done, row.total),
        row.name
    );
}

pub async fn run_status(cfg: &VdqConfig) -> Result<()> {
    let reply = dispatch(cfg, ControlRequest::Status).await?;
    match reply.status {
        Some(view) if reply.ok => view.print(),
        _ => bail!("{}", reply.message),
    }
    Ok(())
}
