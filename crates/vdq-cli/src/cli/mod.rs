//! CLI for the VDQ media download scheduler.

mod commands;
mod context;
mod control_socket;
mod terminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vdq_core::config;

use commands::{
    run_add, run_concurrency, run_rename, run_scheduler, run_series, run_status, run_stop,
    AddArgs,
};

/// Top-level CLI for the VDQ download scheduler.
#[derive(Debug, Parser)]
#[command(name = "vdq")]
#[command(about = "VDQ: resumable media download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a media message for download.
    Add(AddArgs),

    /// Run the scheduler: resume interrupted jobs and work through the queue.
    Run {
        /// Maximum transfers in flight (defaults to max_concurrent_downloads from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Keep serving the control socket after the queue drains, until Ctrl-C.
        #[arg(long)]
        watch: bool,
    },

    /// Show queued and running jobs.
    Status,

    /// Stop a job by its ID. Queued jobs are dropped; running ones stop after the current part.
    Stop {
        /// Job identifier.
        id: String,
    },

    /// Rename a queued job (by current name or ID).
    Rename {
        /// Current display name or job ID.
        current: String,
        /// New display name.
        new_name: String,
        /// Chat the job belongs to.
        #[arg(long, default_value = commands::LOCAL_RECIPIENT)]
        recipient: String,
    },

    /// Change how many transfers may run at once.
    Concurrency {
        /// New limit (at least 1).
        n: usize,
    },

    /// List or create series folders.
    Series {
        #[command(subcommand)]
        action: Option<SeriesAction>,
    },
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum SeriesAction {
    /// List existing series.
    List,
    /// Create a series folder.
    Create {
        /// Series name.
        name: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Add(args) => run_add(&cfg, args).await?,
            CliCommand::Run { jobs, watch } => run_scheduler(&cfg, jobs, watch).await?,
            CliCommand::Status => run_status(&cfg).await?,
            CliCommand::Stop { id } => run_stop(&cfg, &id).await?,
            CliCommand::Rename {
                current,
                new_name,
                recipient,
            } => run_rename(&cfg, &recipient, &current, &new_name).await?,
            CliCommand::Concurrency { n } => run_concurrency(&cfg, n).await?,
            CliCommand::Series { action } => {
                run_series(&cfg, action.unwrap_or(SeriesAction::List)).await?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
