//! `vdq rename <current> <new>`: rename a queued job.

use anyhow::Result;
use vdq_core::config::VdqConfig;
use vdq_core::job::Recipient;

use super::{dispatch, finish};
use crate::cli::control_socket::ControlRequest;

pub async fn run_rename(cfg: &VdqConfig, recipient: &str, current: &str, new_name: &str) -> Result<()> {
    let request = ControlRequest::Rename {
        recipient: Recipient::new(recipient),
        current: current.to_string(),
        new_name: new_name.to_string(),
    };
    finish(dispatch(cfg, request).await?)
}
