//! Persisted shape of a job: one JSON document per key in the metadata store.
//!
//! The offset is stored as a decimal string so readers that only have
//! double-precision numbers never round it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{AddressingInfo, DisplayInfo, Job, JobId, ProgressSnapshot, Recipient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    #[serde(rename = "chatId")]
    pub recipient: Recipient,
    #[serde(rename = "ctxInfo")]
    pub addressing: AddressingInfo,
    #[serde(rename = "videoInfo")]
    pub display: DisplayInfo,
    #[serde(with = "offset_string")]
    pub offset: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(default, rename = "progressInfo", skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSnapshot>,
    #[serde(default)]
    pub stopped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl From<&Job> for JobRecord {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            recipient: job.recipient.clone(),
            addressing: job.addressing.clone(),
            display: job.display.clone(),
            offset: job.offset,
            queue_position: job.queue_position,
            progress: job.progress.clone(),
            stopped: job.stopped,
            file_path: job.file_path.clone(),
        }
    }
}

impl From<JobRecord> for Job {
    fn from(r: JobRecord) -> Self {
        Job {
            id: r.id,
            recipient: r.recipient,
            addressing: r.addressing,
            display: r.display,
            offset: r.offset,
            queue_position: r.queue_position,
            progress: r.progress,
            stopped: r.stopped,
            file_path: r.file_path,
            on_started: None,
        }
    }
}

pub fn encode_record(job: &Job) -> serde_json::Result<String> {
    serde_json::to_string(&JobRecord::from(job))
}

pub fn decode_record(raw: &str) -> serde_json::Result<Job> {
    serde_json::from_str::<JobRecord>(raw).map(Job::from)
}

mod offset_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&offset.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }
        match Raw::deserialize(d)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
        }
    }
}
