//! Aggregated progress across pending and in-flight jobs.

use serde::{Deserialize, Serialize};

use crate::job::{Job, ProgressSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Exactly one transfer and nothing waiting.
    Single(ProgressSnapshot),
    Multiple {
        /// Pending jobs in queue order, zeroed.
        queue: Vec<ProgressSnapshot>,
        /// In-flight jobs with their latest figures.
        downloading: Vec<ProgressSnapshot>,
    },
}

pub fn aggregate(pending: &[&Job], in_flight: &[&Job]) -> Option<ProgressStatus> {
    match (pending.len(), in_flight.len()) {
        (0, 0) => None,
        (0, 1) => Some(ProgressStatus::Single(in_flight[0].snapshot_or_placeholder())),
        _ => Some(ProgressStatus::Multiple {
            queue: pending.iter().map(|j| ProgressSnapshot::placeholder(j)).collect(),
            downloading: in_flight.iter().map(|j| j.snapshot_or_placeholder()).collect(),
        }),
    }
}
