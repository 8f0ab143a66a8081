//! Stop tokens for in-flight transfers.
//!
//! Each job that starts transferring is registered with an abort token.
//! `stop` sets the token; the executor checks it between parts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Shared registry of job id -> abort token.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<String, Arc<AtomicBool>>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job about to transfer; returns the token the executor polls.
    pub fn register(&self, job_id: &str) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id.to_string(), Arc::clone(&token));
        token
    }

    pub fn unregister(&self, job_id: &str) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_id);
    }

    /// Set the job's token. Returns false when no such job is registered.
    pub fn request_abort(&self, job_id: &str) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
        {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

/// Default path for the control socket (same XDG state dir as the store).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("vdq")?.get_state_home();
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_reaches_registered_token() {
        let control = JobControl::new();
        let token = control.register("abc123");
        assert!(!token.load(Ordering::Relaxed));
        assert!(control.request_abort("abc123"));
        assert!(token.load(Ordering::Relaxed));
    }

    #[test]
    fn unknown_or_unregistered_jobs() {
        let control = JobControl::new();
        assert!(!control.request_abort("nope"));
        let token = control.register("j");
        control.unregister("j");
        assert!(!control.request_abort("j"));
        assert!(!token.load(Ordering::Relaxed));
    }
}
