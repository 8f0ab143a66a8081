//! CLI command handlers. Each command is in its own file.

mod add;
mod concurrency;
mod rename;
mod run;
mod series;
mod status;
mod stop;

pub use add::{run_add, AddArgs};
pub use concurrency::run_concurrency;
pub use rename::run_rename;
pub use run::run_scheduler;
pub use series::run_series;
pub use status::{run_status, QueueView};
pub use stop::run_stop;

use anyhow::{bail, Result};
use vdq_core::config::VdqConfig;

use crate::cli::context;
use crate::cli::control_socket::{self, ControlReply, ControlRequest};

/// Recipient used for jobs queued from the command line.
pub const LOCAL_RECIPIENT: &str = "local";

/// Send `request` to the running scheduler, or apply it to the stored queue
/// when none is listening.
pub(crate) async fn dispatch(cfg: &VdqConfig, request: ControlRequest) -> Result<ControlReply> {
    if let Some(reply) = send_to_scheduler(&request).await? {
        return Ok(reply);
    }
    let queue = context::offline_queue(cfg).await?;
    Ok(control_socket::handle_request(&queue, request).await)
}

pub(crate) async fn send_to_scheduler(request: &ControlRequest) -> Result<Option<ControlReply>> {
    match vdq_core::control::default_control_socket_path() {
        Ok(path) => control_socket::send_request(&path, request).await,
        Err(e) => {
            tracing::debug!("control socket path: {}", e);
            Ok(None)
        }
    }
}

/// Print a successful reply's message, or turn a failed one into an error.
pub(crate) fn finish(reply: ControlReply) -> Result<()> {
    if !reply.ok {
        bail!("{}", reply.message);
    }
    if !reply.message.is_empty() {
        println!("{}", reply.message);
    }
    Ok(())
}
