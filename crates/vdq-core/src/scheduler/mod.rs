//! Download queue: FIFO admission under a concurrency cap, one transfer
//! task per in-flight job, every transition persisted.
//!
//! Two locks. `state` (std mutex) guards the in-memory sets and is never
//! held across an await. `structure` (async mutex) serializes operations
//! that change queue shape together with the writes that persist them, so
//! records never land out of order. Progress ticks take only `state`.

mod state;
mod status;


pub use state::{Dequeued, QueueState};
pub use status::{aggregate, ProgressStatus};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::control::JobControl;
use crate::downloader::{Downloader, TransferObserver, TransferOutcome};
use crate::error::{Result, VdqError};
use crate::job::{unique_job_id, AddressingInfo, DisplayInfo, Job, JobId, Recipient, StartedCallback};
use crate::metadata::JobMetadataService;
use crate::sink::{ErrorSink, ProgressSink};

/// What `recover_on_startup` found in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Never-started jobs put back in the queue.
    pub queued: usize,
    /// Interrupted transfers resumed outside the cap.
    pub resumed: usize,
    /// Records of jobs stopped before the crash, now deleted.
    pub discarded: usize,
}

struct Inner {
    state: Mutex<QueueState>,
    structure: tokio::sync::Mutex<()>,
    /// Loaded for editing only: nothing is started.
    held: AtomicBool,
    metadata: Arc<JobMetadataService>,
    downloader: Downloader,
    control: JobControl,
    progress: Arc<dyn ProgressSink>,
    errors: Arc<dyn ErrorSink>,
    counts: watch::Sender<(usize, usize)>,
}

#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<Inner>,
}

impl DownloadQueue {
    pub fn new(
        metadata: Arc<JobMetadataService>,
        downloader: Downloader,
        progress: Arc<dyn ProgressSink>,
        errors: Arc<dyn ErrorSink>,
        max_concurrent: usize,
    ) -> Self {
        let (counts, _) = watch::channel((0, 0));
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::new(max_concurrent)),
                structure: tokio::sync::Mutex::new(()),
                held: AtomicBool::new(false),
                metadata,
                downloader,
                control: JobControl::new(),
                progress,
                errors,
                counts,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_held(&self) -> bool {
        self.inner.held.load(Ordering::Relaxed)
    }

    /// Queue a new job at the tail and return its id.
    ///
    /// The record is written before the job becomes schedulable. A failed
    /// write is reported but the job is still queued.
    pub async fn submit(
        &self,
        recipient: Recipient,
        addressing: AddressingInfo,
        display: DisplayInfo,
        on_started: Option<StartedCallback>,
    ) -> Result<JobId> {
        if display.file_name.trim().is_empty() {
            return Err(VdqError::InvalidArgument("empty file name".into()));
        }
        let guard = self.inner.structure.lock().await;
        let mut job = {
            let st = self.state();
            let id = unique_job_id(|candidate| st.contains(candidate));
            let mut job = Job::new(id, recipient, addressing, display);
            job.queue_position = Some(st.next_position());
            job
        };
        job.on_started = on_started;
        self.persist(&job).await;
        let position = self.state().push_pending(job.clone());
        drop(guard);

        tracing::info!(job_id = %job.id, position, name = %job.display.file_name, "job queued");
        self.publish_counts();
        self.notify(&job.recipient).await;
        if !self.is_held() {
            let queue = self.clone();
            tokio::spawn(async move { queue.fill().await });
        }
        Ok(job.id)
    }

    /// Stop a job. Pending jobs are dropped at once; in-flight jobs are
    /// flagged and retired once the transfer notices.
    pub async fn stop(&self, id: &str) -> Result<()> {
        enum Action {
            Flagged(Job),
            Dequeued(Job, Vec<Job>),
            Dropped(Job),
        }

        let guard = self.inner.structure.lock().await;
        let action = {
            let mut st = self.state();
            if st.is_in_flight(id) {
                if self.is_held() {
                    st.remove_in_flight(id).map(Action::Dropped)
                } else {
                    self.inner.control.request_abort(id);
                    st.mark_stopped(id).map(Action::Flagged)
                }
            } else {
                st.remove_pending(id).map(|(job, moved)| Action::Dequeued(job, moved))
            }
        };

        match action {
            None => Err(VdqError::NotFound(format!("job {id}"))),
            Some(Action::Flagged(job)) => {
                // A crash before the transfer notices must not resume it.
                self.persist(&job).await;
                drop(guard);
                tracing::info!(job_id = %id, "stop requested for running job");
                Ok(())
            }
            Some(Action::Dequeued(job, moved)) => {
                self.forget(&job).await;
                for j in &moved {
                    self.persist(j).await;
                }
                drop(guard);
                tracing::info!(job_id = %id, "queued job removed");
                self.publish_counts();
                self.notify(&job.recipient).await;
                Ok(())
            }
            Some(Action::Dropped(job)) => {
                self.forget(&job).await;
                drop(guard);
                tracing::info!(job_id = %id, "interrupted job discarded");
                self.publish_counts();
                Ok(())
            }
        }
    }

    /// Change the cap. Raising it starts waiting jobs right away.
    pub async fn set_concurrency(&self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(VdqError::InvalidArgument(
                "concurrency must be at least 1".into(),
            ));
        }
        let raised = {
            let mut st = self.state();
            let before = st.max_concurrent();
            st.set_max_concurrent(n);
            n > before
        };
        tracing::info!(max_concurrent = n, "concurrency changed");
        if raised {
            self.fill().await;
        }
        Ok(())
    }

    /// Rename a pending job found by display name (or id).
    ///
    /// Returns `false`, after telling `recipient`, when no pending job matches.
    pub async fn rename(&self, recipient: &Recipient, current: &str, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            let err = VdqError::InvalidArgument("new name is empty".into());
            self.inner.errors.send_error(recipient, &err.to_string()).await;
            return Err(err);
        }

        let guard = self.inner.structure.lock().await;
        let renamed = self.state().rename_pending(current, new_name);
        match renamed {
            Some(job) => {
                self.persist(&job).await;
                drop(guard);
                tracing::info!(job_id = %job.id, from = %current, to = %new_name, "job renamed");
                self.notify(recipient).await;
                Ok(true)
            }
            None => {
                drop(guard);
                self.inner
                    .errors
                    .send_error(recipient, &format!("No queued download named {current}"))
                    .await;
                Ok(false)
            }
        }
    }

    /// Rebuild state from the store and start working.
    ///
    /// Records with a position are queued again in position order
    /// (renumbered from 1). Records without one were transferring when the
    /// process died and resume immediately, outside the cap.
    pub async fn recover_on_startup(&self) -> Result<RecoveryReport> {
        self.restore(false).await
    }

    /// Load the stored queue for editing without starting any transfer.
    pub async fn restore_held(&self) -> Result<RecoveryReport> {
        self.restore(true).await
    }

    async fn restore(&self, hold: bool) -> Result<RecoveryReport> {
        self.inner.held.store(hold, Ordering::Relaxed);
        let guard = self.inner.structure.lock().await;
        let jobs = self.inner.metadata.load_all().await?;

        let (mut queued, interrupted): (Vec<Job>, Vec<Job>) =
            jobs.into_iter().partition(|j| j.queue_position.is_some());
        queued.sort_by(|a, b| (a.queue_position, &a.id).cmp(&(b.queue_position, &b.id)));

        let mut report = RecoveryReport::default();
        let mut renumbered = Vec::new();
        let mut stale = Vec::new();
        let mut resumes = Vec::new();
        {
            let mut st = self.state();
            for job in queued {
                if st.contains(&job.id) {
                    continue;
                }
                let before = job.queue_position;
                let pos = st.push_pending(job.clone());
                if before != Some(pos) {
                    let mut moved = job;
                    moved.queue_position = Some(pos);
                    renumbered.push(moved);
                }
                report.queued += 1;
            }
            for job in interrupted {
                if st.contains(&job.id) {
                    continue;
                }
                if job.stopped {
                    stale.push(job);
                    continue;
                }
                let token = (!hold).then(|| self.inner.control.register(&job.id));
                st.push_in_flight(job.clone());
                resumes.push((job, token));
                report.resumed += 1;
            }
        }
        for job in &renumbered {
            self.persist(job).await;
        }
        for job in &stale {
            self.forget(job).await;
        }
        report.discarded = stale.len();
        drop(guard);

        tracing::info!(
            queued = report.queued,
            resumed = report.resumed,
            discarded = report.discarded,
            held = hold,
            "queue restored"
        );
        self.publish_counts();
        if !hold {
            for (job, token) in resumes {
                if let Some(token) = token {
                    self.spawn_transfer(job, token, true);
                }
            }
            self.fill().await;
        }
        Ok(report)
    }

    /// Pending ids in queue order, then in-flight ids.
    pub fn list_ids(&self) -> Vec<JobId> {
        self.state().list_ids()
    }

    pub fn status(&self) -> Option<ProgressStatus> {
        self.state().status()
    }

    /// (pending, in-flight)
    pub fn counts(&self) -> (usize, usize) {
        self.state().counts()
    }

    pub fn pending(&self) -> Vec<Job> {
        self.state().pending()
    }

    pub fn in_flight(&self) -> Vec<Job> {
        self.state().in_flight()
    }

    pub fn max_concurrent(&self) -> usize {
        self.state().max_concurrent()
    }

    /// Resolves once nothing is pending or in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.counts.subscribe();
        let _ = rx.wait_for(|c| *c == (0, 0)).await;
    }

    /// Start pending jobs until the queue is empty or the cap is reached.
    async fn fill(&self) {
        if self.is_held() {
            return;
        }
        let _guard = self.inner.structure.lock().await;
        loop {
            let next = {
                let mut st = self.state();
                st.take_next().map(|dq| {
                    let token = self.inner.control.register(&dq.job.id);
                    (dq, token)
                })
            };
            let Some((Dequeued { job, renumbered }, token)) = next else {
                break;
            };
            for moved in &renumbered {
                self.persist(moved).await;
            }
            self.persist(&job).await;
            self.publish_counts();
            tracing::info!(job_id = %job.id, name = %job.display.file_name, "job started");
            if let Some(callback) = &job.on_started {
                callback(job.id.as_str());
            }
            self.notify(&job.recipient).await;
            self.spawn_transfer(job, token, false);
        }
    }

    fn spawn_transfer(&self, job: Job, token: Arc<AtomicBool>, resume: bool) {
        let queue = self.clone();
        tokio::spawn(async move { queue.run_transfer(job, token, resume).await });
    }

    async fn run_transfer(&self, mut job: Job, token: Arc<AtomicBool>, resume: bool) {
        let observer = QueueObserver {
            queue: self.clone(),
            token,
        };
        let outcome = if resume {
            self.inner.downloader.resume(&mut job, &observer).await
        } else {
            self.inner.downloader.start(&mut job, &observer).await
        };
        self.inner.control.unregister(&job.id);

        match outcome {
            // on_complete already retired it
            Ok(TransferOutcome::Completed) => {}
            Ok(TransferOutcome::Stopped) => {
                tracing::info!(job_id = %job.id, offset = job.offset, "job stopped");
                self.retire(&job).await;
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, offset = job.offset, error = %e, "transfer failed");
                self.inner
                    .errors
                    .send_error(
                        &job.recipient,
                        &format!("Error downloading {}: {}", job.display.file_name, e),
                    )
                    .await;
                self.retire(&job).await;
            }
        }
    }

    /// Drop a finished in-flight job, delete its record, start the next.
    async fn retire(&self, job: &Job) {
        {
            // Under `structure` so a concurrent stop cannot re-save the record after it is deleted.
            let _guard = self.inner.structure.lock().await;
            if self.state().remove_in_flight(&job.id).is_none() {
                return;
            }
            self.forget(job).await;
        }
        self.publish_counts();
        self.notify(&job.recipient).await;
        self.fill().await;
    }

    async fn persist(&self, job: &Job) {
        if let Err(e) = self.inner.metadata.save(&job.id, job).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to persist job");
            self.inner
                .errors
                .send_error(
                    &job.recipient,
                    &format!("Could not save state of {}: {}", job.display.file_name, e),
                )
                .await;
        }
    }

    async fn forget(&self, job: &Job) {
        if let Err(e) = self.inner.metadata.delete(&job.id).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to delete job record");
            self.inner
                .errors
                .send_error(
                    &job.recipient,
                    &format!("Could not delete state of {}: {}", job.display.file_name, e),
                )
                .await;
        }
    }

    async fn notify(&self, recipient: &Recipient) {
        let status = self.status();
        self.inner.progress.update(recipient, status.as_ref()).await;
    }

    fn publish_counts(&self) {
        let counts = self.counts();
        self.inner.counts.send_replace(counts);
    }
}

struct QueueObserver {
    queue: DownloadQueue,
    token: Arc<AtomicBool>,
}

#[async_trait]
impl TransferObserver for QueueObserver {
    async fn on_progress(&self, job: &Job) {
        let merged = self.queue.state().record_progress(job);
        if let Some(merged) = merged {
            self.queue.persist(&merged).await;
        }
        self.queue.notify(&job.recipient).await;
    }

    fn should_stop(&self) -> bool {
        self.token.load(Ordering::Relaxed)
    }

    async fn on_complete(&self, job: &Job) {
        tracing::info!(job_id = %job.id, path = ?job.file_path, "job complete");
        self.queue.retire(job).await;
    }
}
