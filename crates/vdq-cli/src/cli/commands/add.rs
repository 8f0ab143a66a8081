//! `vdq add`: queue one channel message for download.

use anyhow::{Context, Result};
use clap::Args;
use vdq_core::config::VdqConfig;
use vdq_core::job::{AddressingInfo, DisplayInfo, Recipient};
use vdq_core::library;
use vdq_core::naming::{CaptionProposer, NamingRequest, ValidatedNamer};
use vdq_core::session::{ChatSession, IncomingMedia};

use super::{dispatch, finish, LOCAL_RECIPIENT};
use crate::cli::control_socket::ControlRequest;

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Channel the message was posted in.
    #[arg(long)]
    pub channel: String,
    /// Message date (unix seconds). The closest message with media is used.
    #[arg(long)]
    pub date: i64,
    /// Expected file size in bytes.
    #[arg(long)]
    pub size: u64,
    /// File extension without the dot.
    #[arg(long, default_value = "mp4")]
    pub ext: String,
    /// Display name; derived from --file-name or --caption when omitted.
    #[arg(long)]
    pub name: Option<String>,
    /// Original file name of the attachment.
    #[arg(long)]
    pub file_name: Option<String>,
    /// Message caption.
    #[arg(long)]
    pub caption: Option<String>,
    /// Store as an episode of this series (created if missing).
    #[arg(long)]
    pub series: Option<String>,
    /// Season number for episode names (with --series).
    #[arg(long, requires = "series")]
    pub season: Option<u32>,
    /// Duration in seconds, shown in status.
    #[arg(long, default_value = "0")]
    pub duration: u64,
    /// Chat the job belongs to.
    #[arg(long, default_value = LOCAL_RECIPIENT)]
    pub recipient: String,
}

impl AddArgs {
    fn naming_context(&self) -> String {
        serde_json::json!({
            "fileName": self.file_name,
            "caption": self.caption,
            "messageId": format!("{}_{}", self.channel, self.date),
            "date": self.date,
        })
        .to_string()
    }
}

async fn session_for(cfg: &VdqConfig, args: &AddArgs) -> Result<ChatSession> {
    let Some(series) = &args.series else {
        return Ok(ChatSession::Movie);
    };
    let folder = library::create_series(&cfg.video_dir, series).await?;
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("series folder has no name")?;
    Ok(ChatSession::series(name, args.season))
}

async fn display_name(cfg: &VdqConfig, args: &AddArgs, session: &ChatSession) -> Result<String> {
    if let Some(name) = &args.name {
        return Ok(name.clone());
    }
    let request = NamingRequest {
        context_json: args.naming_context(),
        known_groups: library::list_series(&cfg.video_dir).await?,
        hint: session.naming_hint(),
    };
    let name = ValidatedNamer::new(CaptionProposer).generate(&request).await?;
    Ok(name)
}

pub(crate) async fn build_request(cfg: &VdqConfig, args: &AddArgs) -> Result<ControlRequest> {
    let session = session_for(cfg, args).await?;
    let name = display_name(cfg, args, &session).await?;
    let display: DisplayInfo = session.display_info(&IncomingMedia {
        file_name: name,
        size: args.size,
        duration_secs: args.duration,
        file_id: format!("{}/{}", args.channel, args.date),
    });
    Ok(ControlRequest::Add {
        recipient: Recipient::new(args.recipient.as_str()),
        addressing: AddressingInfo {
            channel: args.channel.clone(),
            message_date: args.date,
            file_size: args.size,
            extension: args.ext.trim_start_matches('.').to_string(),
        },
        display,
    })
}

pub async fn run_add(cfg: &VdqConfig, args: AddArgs) -> Result<()> {
    let request = build_request(cfg, &args).await?;
    let reply = dispatch(cfg, request).await?;
    if reply.ok {
        println!("Queued job {}", reply.message);
        return Ok(());
    }
    finish(reply)
}
