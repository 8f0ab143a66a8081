//! Chunked transfer executor.
//!
//! Streams one job's document to disk part by part. After every part the
//! bytes are synced, `job.offset` advances, the observer sees the job and
//! is asked whether to stop. The executor never touches queue membership.

pub mod path;
pub mod progress;
mod writer;

pub use path::{destination_path, sanitize_file_name};
pub use progress::{percentage, ProgressFigures};
pub use writer::PartWriter;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Result, VdqError};
use crate::job::Job;
use crate::source::{LocatedMedia, MediaSource};

/// Callbacks the executor drives during a transfer.
#[async_trait]
pub trait TransferObserver: Send + Sync {
    /// Called after each synced part and once more with the final 100 % tick.
    async fn on_progress(&self, job: &Job);
    /// Polled after every part (and once before the first fetch).
    fn should_stop(&self) -> bool;
    async fn on_complete(&self, job: &Job);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    /// The observer asked to stop; the partial file stays on disk.
    Stopped,
}

pub struct Downloader {
    source: Arc<dyn MediaSource>,
    video_dir: PathBuf,
}

impl Downloader {
    pub fn new(source: Arc<dyn MediaSource>, video_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            video_dir: video_dir.into(),
        }
    }

    /// Resolve the destination, then transfer from byte 0.
    pub async fn start(&self, job: &mut Job, observer: &dyn TransferObserver) -> Result<TransferOutcome> {
        let media = self.source.locate(&job.addressing).await?;
        if media.total_size != job.total_size() {
            tracing::warn!(
                job_id = %job.id,
                expected = job.total_size(),
                located = media.total_size,
                "located size differs from submitted size, using located size"
            );
            job.addressing.file_size = media.total_size;
        }

        let path = destination_path(&self.video_dir, job);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let writer = PartWriter::open_fresh(&path).await?;
        job.file_path = Some(path);
        job.offset = 0;
        tracing::info!(job_id = %job.id, path = %writer.path().display(), total = media.total_size, "transfer started");
        self.run(job, observer, &media, writer).await
    }

    /// Continue at `job.offset` into the already resolved path.
    pub async fn resume(&self, job: &mut Job, observer: &dyn TransferObserver) -> Result<TransferOutcome> {
        let Some(path) = job.file_path.clone() else {
            tracing::info!(job_id = %job.id, "no destination recorded, starting from scratch");
            return self.start(job, observer).await;
        };

        let media = self.source.locate(&job.addressing).await?;
        if media.total_size != job.total_size() {
            return Err(VdqError::Transfer(format!(
                "remote size changed from {} to {} bytes",
                job.total_size(),
                media.total_size
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let writer = PartWriter::open_resume(&path, job.offset.min(media.total_size)).await?;
        if writer.position() != job.offset {
            tracing::warn!(
                job_id = %job.id,
                recorded = job.offset,
                on_disk = writer.position(),
                "partial file disagrees with recorded offset"
            );
            job.offset = writer.position();
        }
        tracing::info!(job_id = %job.id, offset = job.offset, total = media.total_size, "transfer resumed");
        self.run(job, observer, &media, writer).await
    }

    async fn run(
        &self,
        job: &mut Job,
        observer: &dyn TransferObserver,
        media: &LocatedMedia,
        mut writer: PartWriter,
    ) -> Result<TransferOutcome> {
        let total = media.total_size;
        let base = job.offset;
        let began = Instant::now();

        if observer.should_stop() {
            return Ok(TransferOutcome::Stopped);
        }

        let mut stream = self.source.open(media, job.offset).await?;
        while let Some(part) = stream.next_part().await? {
            if part.is_empty() {
                continue;
            }
            let next = job.offset + part.len() as u64;
            if next > total {
                return Err(VdqError::Transfer(format!(
                    "source sent {} bytes past the declared size of {}",
                    next - total,
                    total
                )));
            }
            writer.append(&part).await?;
            writer.sync().await?;
            job.offset = next;

            let figures = ProgressFigures::compute(began.elapsed(), job.offset, job.offset - base, total);
            job.progress = Some(figures.snapshot(job, job.offset, total));
            observer.on_progress(job).await;

            if observer.should_stop() {
                tracing::info!(job_id = %job.id, offset = job.offset, "transfer stopped");
                return Ok(TransferOutcome::Stopped);
            }
        }

        if job.offset < total {
            return Err(VdqError::Transfer(format!(
                "stream ended at {} of {} bytes",
                job.offset, total
            )));
        }

        job.progress = Some(ProgressFigures::finished().snapshot(job, total, total));
        observer.on_progress(job).await;
        observer.on_complete(job).await;
        tracing::info!(job_id = %job.id, bytes = total, elapsed_ms = began.elapsed().as_millis() as u64, "transfer complete");
        Ok(TransferOutcome::Completed)
    }
}
