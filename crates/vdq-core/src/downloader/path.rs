//! Destination paths: `<video_dir>/movies/<name>.<ext>` or
//! `<video_dir>/tv/<series>/<name>.<ext>`.

use std::path::{Path, PathBuf};

use crate::job::Job;

pub const MOVIES_DIR: &str = "movies";
pub const SERIES_DIR: &str = "tv";

/// Make `name` safe as a single Linux path component.
///
/// NUL, slashes, control characters and blanks become `_` (collapsed),
/// leading/trailing dots and underscores are trimmed, and the result is
/// cut to 255 bytes on a char boundary.
pub fn sanitize_file_name(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// Where `job` is written. Resolved once, at first start.
pub fn destination_path(video_dir: &Path, job: &Job) -> PathBuf {
    let mut stem = sanitize_file_name(&job.display.file_name);
    if stem.is_empty() {
        stem = job.id.clone();
    }
    let file = if job.addressing.extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, sanitize_file_name(&job.addressing.extension))
    };

    let series = job
        .display
        .series_name
        .as_deref()
        .map(sanitize_file_name)
        .filter(|s| !s.is_empty());
    match (job.display.is_series, series) {
        (true, Some(series)) => video_dir.join(SERIES_DIR).join(series).join(file),
        _ => video_dir.join(MOVIES_DIR).join(file),
    }
}
