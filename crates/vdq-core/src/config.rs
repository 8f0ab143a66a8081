use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters for part fetches (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per part (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Which metadata store backs the job records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Whole-file JSON map (one key per job).
    #[default]
    Json,
    /// SQLite `kv` table.
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Store location; defaults to `~/.local/state/vdq/downloads.{json,db}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL under which each channel serves `<channel>/index.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Global configuration loaded from `~/.config/vdq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdqConfig {
    /// Maximum number of transfers in flight for newly admitted jobs.
    pub max_concurrent_downloads: usize,
    /// Root directory; movies land in `movies/`, series in `tv/<series>/`.
    pub video_dir: PathBuf,
    /// Size of each streamed part. Bounds how long a stop request can wait.
    pub part_size_bytes: u64,
    /// Minimum interval between two rendered progress updates per recipient.
    pub progress_interval_ms: u64,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for VdqConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            video_dir: PathBuf::from("videos"),
            part_size_bytes: 512 * 1024,
            progress_interval_ms: 5000,
            store: StoreConfig::default(),
            source: SourceConfig::default(),
            retry: None,
        }
    }
}

impl VdqConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Store path from config, or the XDG state default for the configured backend.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.store.path {
            return Ok(p.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdq")?;
        let name = match self.store.backend {
            StoreBackend::Json => "downloads.json",
            StoreBackend::Sqlite => "downloads.db",
        };
        Ok(xdg_dirs.get_state_home().join(name))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VdqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<VdqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: VdqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Write `cfg` to `path` as TOML, replacing the file.
pub fn save_to(path: &Path, cfg: &VdqConfig) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
    Ok(())
}
