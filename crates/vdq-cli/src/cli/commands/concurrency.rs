//! `vdq concurrency <n>`: change the cap of the running scheduler, or the
//! configured default when none is running.

use anyhow::{bail, Result};
use vdq_core::config::{self, VdqConfig};

use super::{finish, send_to_scheduler};
use crate::cli::control_socket::ControlRequest;

pub async fn run_concurrency(cfg: &VdqConfig, n: usize) -> Result<()> {
    if let Some(reply) = send_to_scheduler(&ControlRequest::Concurrency { n }).await? {
        return finish(reply);
    }
    if n == 0 {
        bail!("invalid argument: concurrency must be at least 1");
    }
    let path = config::config_path()?;
    let updated = VdqConfig {
        max_concurrent_downloads: n,
        ..cfg.clone()
    };
    config::save_to(&path, &updated)?;
    println!("No scheduler running; max_concurrent_downloads = {n} saved to {}", path.display());
    Ok(())
}
