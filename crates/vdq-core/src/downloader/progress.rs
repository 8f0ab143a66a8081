//! Progress figures for one transfer attempt.
//!
//! Percentage comes from the cumulative offset; speed and ETA only from
//! bytes moved since this attempt began, so a resume does not report the
//! bytes already on disk as instant throughput.

use indicatif::{HumanBytes, HumanDuration};
use std::time::Duration;

use crate::job::{Job, ProgressSnapshot};

/// Shown when the ETA is unknown or too far out to represent.
pub const UNKNOWN_ETA: &str = "∞";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressFigures {
    pub percentage: u8,
    pub bytes_per_sec: f64,
    /// `None` when speed is zero or the estimate does not fit a `Duration`.
    pub eta: Option<Duration>,
}

/// `floor(offset * 100 / total)`, 100 for an empty file.
pub fn percentage(offset: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (offset.min(total) as u128 * 100) / total as u128;
    pct as u8
}

impl ProgressFigures {
    pub fn zero() -> Self {
        Self {
            percentage: 0,
            bytes_per_sec: 0.0,
            eta: None,
        }
    }

    /// The forced last tick: 100 %, nothing left, no speed.
    pub fn finished() -> Self {
        Self {
            percentage: 100,
            bytes_per_sec: 0.0,
            eta: Some(Duration::ZERO),
        }
    }

    pub fn compute(elapsed: Duration, offset: u64, attempt_bytes: u64, total: u64) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            attempt_bytes as f64 / secs
        } else {
            0.0
        };
        let remaining = total.saturating_sub(offset);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if bytes_per_sec > 0.0 {
            Duration::try_from_secs_f64(remaining as f64 / bytes_per_sec).ok()
        } else {
            None
        };
        Self {
            percentage: percentage(offset, total),
            bytes_per_sec,
            eta,
        }
    }

    pub fn snapshot(&self, job: &Job, offset: u64, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            id: job.id.clone(),
            file_name: job.display.file_name.clone(),
            series_name: job.display.series_name.clone(),
            percentage: self.percentage,
            progress: HumanBytes(offset).to_string(),
            total: HumanBytes(total).to_string(),
            speed: format!("{}/s", HumanBytes(self.bytes_per_sec as u64)),
            time_left: self
                .eta
                .map(|d| HumanDuration(d).to_string())
                .unwrap_or_else(|| UNKNOWN_ETA.to_string()),
            bytes_done: offset,
            total_bytes: total,
        }
    }
}
