//! Download job model: what the scheduler tracks and what the executor mutates.
//!
//! The scheduler owns membership (pending vs in-flight); the executor only
//! touches `offset`, `progress` and `file_path` of the job it is handed.

mod id;
mod record;

pub use id::{new_job_id, unique_job_id};
pub use record::{decode_record, encode_record, JobRecord};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Short unique job identifier (6 URL-safe characters).
pub type JobId = String;

/// Chat or user that submitted a job and receives its notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Recipient(pub String);

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Recipient {
    // Chat ids are numeric for private chats and symbolic for channels.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Recipient(n.to_string()),
            Raw::Str(s) => Recipient(s),
        })
    }
}

/// Where the source finds the file. Opaque to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressingInfo {
    /// Symbolic channel/chat name the message lives in.
    #[serde(rename = "chatName")]
    pub channel: String,
    /// Message timestamp (unix seconds).
    #[serde(rename = "msgDateSeconds")]
    pub message_date: i64,
    /// Expected total size in bytes.
    pub file_size: u64,
    /// File extension without the dot.
    pub extension: String,
}

/// User-facing metadata. Mutable only through rename.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub file_name: String,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub is_series: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
}

/// Last computed progress figures for one job, already formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub id: JobId,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(rename = "progressPercentage")]
    pub percentage: u8,
    pub progress: String,
    pub total: String,
    pub speed: String,
    pub time_left: String,
    #[serde(default)]
    pub bytes_done: u64,
    #[serde(default)]
    pub total_bytes: u64,
}

impl ProgressSnapshot {
    /// Zeroed figures for a job that has not produced a tick yet.
    pub fn placeholder(job: &Job) -> Self {
        crate::downloader::progress::ProgressFigures::zero().snapshot(job, 0, job.total_size())
    }
}

/// Invoked with the job id when a job leaves the queue and starts transferring.
pub type StartedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// One requested file transfer.
#[derive(Clone)]
pub struct Job {
    pub id: JobId,
    pub recipient: Recipient,
    pub addressing: AddressingInfo,
    pub display: DisplayInfo,
    /// Bytes confirmed on disk; the resume point.
    pub offset: u64,
    /// 1-based rank while pending, `None` once dequeued.
    pub queue_position: Option<u32>,
    pub progress: Option<ProgressSnapshot>,
    pub stopped: bool,
    /// Resolved once at first start, reused on resume.
    pub file_path: Option<PathBuf>,
    pub on_started: Option<StartedCallback>,
}

impl Job {
    pub fn new(
        id: JobId,
        recipient: Recipient,
        addressing: AddressingInfo,
        display: DisplayInfo,
    ) -> Self {
        Self {
            id,
            recipient,
            addressing,
            display,
            offset: 0,
            queue_position: None,
            progress: None,
            stopped: false,
            file_path: None,
            on_started: None,
        }
    }

    /// Total size the transfer must reach.
    pub fn total_size(&self) -> u64 {
        self.addressing.file_size
    }

    /// Latest snapshot, or zeroed figures before the first tick.
    pub fn snapshot_or_placeholder(&self) -> ProgressSnapshot {
        self.progress
            .clone()
            .unwrap_or_else(|| ProgressSnapshot::placeholder(self))
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("recipient", &self.recipient)
            .field("addressing", &self.addressing)
            .field("display", &self.display)
            .field("offset", &self.offset)
            .field("queue_position", &self.queue_position)
            .field("progress", &self.progress)
            .field("stopped", &self.stopped)
            .field("file_path", &self.file_path)
            .field("on_started", &self.on_started.is_some())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    #[test]
    fn recipient_accepts_numeric_and_symbolic_ids() {
        let n: Recipient = serde_json::from_str("123456").unwrap();
        assert_eq!(n, Recipient::new("123456"));
        let s: Recipient = serde_json::from_str("\"@someone\"").unwrap();
        assert_eq!(s, Recipient::new("@someone"));
    }

    #[test]
    fn placeholder_is_zeroed() {
        let job = fixtures::job("abc123", 1000);
        let snap = job.snapshot_or_placeholder();
        assert_eq!(snap.id, "abc123");
        assert_eq!(snap.percentage, 0);
        assert_eq!(snap.bytes_done, 0);
        assert_eq!(snap.file_name, "Movie_abc123");
    }
}
