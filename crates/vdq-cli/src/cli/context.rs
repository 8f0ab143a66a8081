//! Wiring shared by the commands: store, source and queue construction.

use anyhow::{Context, Result};
use std::sync::Arc;
use vdq_core::config::VdqConfig;
use vdq_core::downloader::Downloader;
use vdq_core::metadata::JobMetadataService;
use vdq_core::scheduler::DownloadQueue;
use vdq_core::sink::{ErrorSink, LogSink, ProgressSink};
use vdq_core::source::{HttpChannelSource, MediaSource, MemorySource};
use vdq_core::store;

pub async fn open_metadata(cfg: &VdqConfig) -> Result<Arc<JobMetadataService>> {
    let path = cfg.store_path()?;
    let store = store::open(cfg.store.backend, &path)
        .await
        .with_context(|| format!("open job store {}", path.display()))?;
    Ok(Arc::new(JobMetadataService::new(store)))
}

pub fn http_source(cfg: &VdqConfig) -> Result<Arc<dyn MediaSource>> {
    let base = cfg
        .source
        .base_url
        .as_deref()
        .context("no [source] base_url in config.toml")?;
    let source = HttpChannelSource::new(base, cfg.part_size_bytes, cfg.retry_policy())?;
    Ok(Arc::new(source))
}

pub fn queue(
    cfg: &VdqConfig,
    metadata: Arc<JobMetadataService>,
    source: Arc<dyn MediaSource>,
    progress: Arc<dyn ProgressSink>,
    errors: Arc<dyn ErrorSink>,
    max_concurrent: usize,
) -> DownloadQueue {
    DownloadQueue::new(
        metadata,
        Downloader::new(source, &cfg.video_dir),
        progress,
        errors,
        max_concurrent,
    )
}

/// The stored queue loaded for editing. Nothing transfers, so no source is needed.
pub async fn offline_queue(cfg: &VdqConfig) -> Result<DownloadQueue> {
    let metadata = open_metadata(cfg).await?;
    let queue = queue(
        cfg,
        metadata,
        Arc::new(MemorySource::new(cfg.part_size_bytes as usize)),
        Arc::new(LogSink),
        Arc::new(LogSink),
        cfg.max_concurrent_downloads,
    );
    queue.restore_held().await?;
    Ok(queue)
}
