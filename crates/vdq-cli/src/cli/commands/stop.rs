//! `vdq stop <id>`: drop a queued job, or stop a running one after its current part.

use anyhow::Result;
use vdq_core::config::VdqConfig;

use super::{dispatch, finish};
use crate::cli::control_socket::ControlRequest;

pub async fn run_stop(cfg: &VdqConfig, id: &str) -> Result<()> {
    let reply = dispatch(cfg, ControlRequest::Stop { id: id.to_string() }).await?;
    finish(reply)
}
