//! `vdq run`: recover the stored queue and work through it.

use anyhow::Result;
use std::sync::Arc;
use vdq_core::config::VdqConfig;
use vdq_core::sink::ThrottledProgressSink;

use crate::cli::context;
use crate::cli::control_socket;
use crate::cli::terminal::TerminalSink;

pub async fn run_scheduler(cfg: &VdqConfig, jobs: Option<usize>, watch: bool) -> Result<()> {
    let metadata = context::open_metadata(cfg).await?;
    let source = context::http_source(cfg)?;
    let progress = Arc::new(ThrottledProgressSink::new(
        TerminalSink,
        cfg.progress_interval(),
    ));
    let max = jobs.unwrap_or(cfg.max_concurrent_downloads).max(1);
    let queue = context::queue(cfg, metadata, source, progress, Arc::new(TerminalSink), max);

    let report = queue.recover_on_startup().await?;
    if report.resumed > 0 || report.queued > 0 {
        println!(
            "Recovered {} queued and {} interrupted job(s) from previous run",
            report.queued, report.resumed
        );
    }

    let socket_path = vdq_core::control::default_control_socket_path().ok();
    let listener = socket_path.as_ref().and_then(|path| {
        match control_socket::spawn_control_listener(queue.clone(), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {}", e);
                None
            }
        }
    });

    if watch {
        println!("Watching for new jobs; Ctrl-C to exit.");
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            _ = queue.wait_idle() => {}
            r = tokio::signal::ctrl_c() => r?,
        }
    }

    if let Some(handle) = listener {
        handle.abort();
        if let Some(path) = &socket_path {
            let _ = std::fs::remove_file(path);
        }
    }

    let (pending, in_flight) = queue.counts();
    if pending + in_flight > 0 {
        // Offsets are persisted after every part; the next run picks up from there.
        println!("Interrupted; {} job(s) will continue on the next run.", pending + in_flight);
    } else {
        println!("Queue empty.");
    }
    tracing::info!(pending, in_flight, "run finished");
    Ok(())
}
