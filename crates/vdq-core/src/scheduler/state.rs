//! In-memory queue bookkeeping. No I/O: every method runs under one lock
//! and returns the jobs whose persisted record must change.

use std::collections::VecDeque;

use super::status::{aggregate, ProgressStatus};
use crate::job::{Job, JobId};

#[derive(Debug)]
pub struct QueueState {
    pending: VecDeque<Job>,
    in_flight: Vec<Job>,
    max_concurrent: usize,
}

/// A job moved from the head of the queue to in-flight.
#[derive(Debug)]
pub struct Dequeued {
    pub job: Job,
    /// Pending jobs whose position shifted.
    pub renumbered: Vec<Job>,
}

impl QueueState {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: Vec::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn set_max_concurrent(&mut self, n: usize) {
        self.max_concurrent = n.max(1);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pending.iter().any(|j| j.id == id) || self.in_flight.iter().any(|j| j.id == id)
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.iter().any(|j| j.id == id)
    }

    /// (pending, in-flight)
    pub fn counts(&self) -> (usize, usize) {
        (self.pending.len(), self.in_flight.len())
    }

    /// Position the next pushed job will get.
    pub fn next_position(&self) -> u32 {
        self.pending.len() as u32 + 1
    }

    /// Append at the tail; returns the assigned 1-based position.
    pub fn push_pending(&mut self, mut job: Job) -> u32 {
        let pos = self.next_position();
        job.queue_position = Some(pos);
        self.pending.push_back(job);
        pos
    }

    /// Add a job straight to in-flight, ignoring the cap (recovered resumes).
    pub fn push_in_flight(&mut self, mut job: Job) {
        job.queue_position = None;
        self.in_flight.push(job);
    }

    /// Dequeue the head if a slot is free.
    pub fn take_next(&mut self) -> Option<Dequeued> {
        if self.in_flight.len() >= self.max_concurrent {
            return None;
        }
        let mut job = self.pending.pop_front()?;
        job.queue_position = None;
        self.in_flight.push(job.clone());
        Some(Dequeued {
            job,
            renumbered: self.renumber(),
        })
    }

    /// Remove a pending job; returns it and the jobs that moved up.
    pub fn remove_pending(&mut self, id: &str) -> Option<(Job, Vec<Job>)> {
        let idx = self.pending.iter().position(|j| j.id == id)?;
        let job = self.pending.remove(idx)?;
        Some((job, self.renumber()))
    }

    pub fn remove_in_flight(&mut self, id: &str) -> Option<Job> {
        let idx = self.in_flight.iter().position(|j| j.id == id)?;
        Some(self.in_flight.remove(idx))
    }

    /// Flag an in-flight job as stopped and return the updated copy.
    pub fn mark_stopped(&mut self, id: &str) -> Option<Job> {
        let job = self.in_flight.iter_mut().find(|j| j.id == id)?;
        job.stopped = true;
        Some(job.clone())
    }

    /// Copy transfer-owned fields from the executor's copy of the job and
    /// return the merged job. `None` once the job has left the in-flight set.
    pub fn record_progress(&mut self, job: &Job) -> Option<Job> {
        let slot = self.in_flight.iter_mut().find(|j| j.id == job.id)?;
        slot.offset = job.offset;
        slot.progress = job.progress.clone();
        slot.file_path = job.file_path.clone();
        slot.addressing.file_size = job.addressing.file_size;
        Some(slot.clone())
    }

    /// Rename the first pending job whose display name or id is `current`.
    pub fn rename_pending(&mut self, current: &str, new_name: &str) -> Option<Job> {
        let job = self
            .pending
            .iter_mut()
            .find(|j| j.display.file_name == current || j.id == current)?;
        job.display.file_name = new_name.to_string();
        if let Some(progress) = job.progress.as_mut() {
            progress.file_name = new_name.to_string();
        }
        Some(job.clone())
    }

    /// Pending ids in queue order, then in-flight ids.
    pub fn list_ids(&self) -> Vec<JobId> {
        self.pending
            .iter()
            .chain(self.in_flight.iter())
            .map(|j| j.id.clone())
            .collect()
    }

    pub fn pending(&self) -> Vec<Job> {
        self.pending.iter().cloned().collect()
    }

    pub fn in_flight(&self) -> Vec<Job> {
        self.in_flight.clone()
    }

    pub fn status(&self) -> Option<ProgressStatus> {
        let pending: Vec<&Job> = self.pending.iter().collect();
        let in_flight: Vec<&Job> = self.in_flight.iter().collect();
        aggregate(&pending, &in_flight)
    }

    /// Restore positions `1..=N`; returns jobs whose position changed.
    fn renumber(&mut self) -> Vec<Job> {
        let mut changed = Vec::new();
        for (i, job) in self.pending.iter_mut().enumerate() {
            let pos = Some(i as u32 + 1);
            if job.queue_position != pos {
                job.queue_position = pos;
                changed.push(job.clone());
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::fixtures;

    fn positions(st: &QueueState) -> Vec<(String, u32)> {
        st.pending()
            .into_iter()
            .map(|j| (j.id, j.queue_position.unwrap_or(0)))
            .collect()
    }

    fn state_with(ids: &[&str], max: usize) -> QueueState {
        let mut st = QueueState::new(max);
        for id in ids {
            st.push_pending(fixtures::job(id, 100));
        }
        st
    }

    #[test]
    fn cap_bounds_dequeue() {
        let mut st = state_with(&["j1", "j2", "j3", "j4"], 2);
        let a = st.take_next().unwrap();
        let b = st.take_next().unwrap();
        assert!(st.take_next().is_none());
        assert_eq!((a.job.id.as_str(), b.job.id.as_str()), ("j1", "j2"));
        assert!(a.job.queue_position.is_none());
        assert_eq!(positions(&st), vec![("j3".into(), 1), ("j4".into(), 2)]);
        assert_eq!(b.renumbered.len(), 2);
        assert_eq!(st.counts(), (2, 2));
    }

    #[test]
    fn removing_from_the_middle_renumbers() {
        let mut st = state_with(&["a", "b", "c", "d"], 1);
        let (removed, moved) = st.remove_pending("b").unwrap();
        assert_eq!(removed.id, "b");
        assert_eq!(moved.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(), vec!["c", "d"]);
        assert_eq!(
            positions(&st),
            vec![("a".into(), 1), ("c".into(), 2), ("d".into(), 3)]
        );
        assert!(st.remove_pending("zzz").is_none());
    }

    #[test]
    fn recovered_resumes_ignore_cap() {
        let mut st = QueueState::new(1);
        st.push_in_flight(fixtures::job("r1", 10));
        st.push_in_flight(fixtures::job("r2", 10));
        st.push_pending(fixtures::job("p1", 10));
        assert!(st.take_next().is_none());
        assert_eq!(st.list_ids(), vec!["p1", "r1", "r2"]);
        st.remove_in_flight("r1");
        st.remove_in_flight("r2");
        assert_eq!(st.take_next().unwrap().job.id, "p1");
    }

    #[test]
    fn stop_flag_and_progress_only_touch_in_flight() {
        let mut st = state_with(&["a", "b"], 1);
        st.take_next();
        assert!(st.mark_stopped("a").unwrap().stopped);
        assert!(st.mark_stopped("b").is_none());

        let mut copy = fixtures::job("a", 100);
        copy.offset = 40;
        let merged = st.record_progress(&copy).unwrap();
        assert_eq!(merged.offset, 40);
        assert!(merged.stopped);
        assert_eq!(st.in_flight()[0].offset, 40);
        assert!(st.record_progress(&fixtures::job("b", 100)).is_none());
    }

    #[test]
    fn rename_matches_pending_by_name_or_id() {
        let mut st = state_with(&["a", "b"], 1);
        st.take_next();
        assert!(st.rename_pending("Movie_a", "nope").is_none());
        let renamed = st.rename_pending("Movie_b", "Heat").unwrap();
        assert_eq!(renamed.display.file_name, "Heat");
        assert!(st.rename_pending("b", "Heat 2").is_some());
        assert_eq!(st.pending()[0].display.file_name, "Heat 2");
    }

    #[test]
    fn zero_cap_is_clamped() {
        let mut st = QueueState::new(0);
        assert_eq!(st.max_concurrent(), 1);
        st.set_max_concurrent(0);
        assert_eq!(st.max_concurrent(), 1);
    }
}
