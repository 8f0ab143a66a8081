//! Series folders under `<video_dir>/tv`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::downloader::path::SERIES_DIR;
use crate::downloader::sanitize_file_name;
use crate::error::{Result, VdqError};

/// Names of existing series, sorted. A missing `tv` directory means none.
pub async fn list_series(video_dir: &Path) -> Result<Vec<String>> {
    let dir = video_dir.join(SERIES_DIR);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Create the folder for `name` (sanitized). Existing folders are fine.
pub async fn create_series(video_dir: &Path, name: &str) -> Result<PathBuf> {
    let clean = sanitize_file_name(name);
    if clean.is_empty() {
        return Err(VdqError::InvalidArgument(format!("series name {name:?}")));
    }
    let path = video_dir.join(SERIES_DIR).join(&clean);
    tokio::fs::create_dir_all(&path).await?;
    tracing::info!(series = %clean, path = %path.display(), "series folder ready");
    Ok(path)
}
