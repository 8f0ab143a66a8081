//! Control socket: server (during `vdq run`) and client (for the other commands).
//! Protocol: one JSON request per line, answered by one JSON reply line.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use vdq_core::job::{AddressingInfo, DisplayInfo, Recipient, StartedCallback};
use vdq_core::error::VdqError;
use vdq_core::scheduler::DownloadQueue;

use crate::cli::commands::QueueView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ControlRequest {
    Add {
        recipient: Recipient,
        addressing: AddressingInfo,
        display: DisplayInfo,
    },
    Stop {
        id: String,
    },
    Rename {
        recipient: Recipient,
        current: String,
        new_name: String,
    },
    Concurrency {
        n: usize,
    },
    Status,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlReply {
    pub ok: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QueueView>,
}

impl ControlReply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            status: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            status: None,
        }
    }

    /// Failed reply for a queue error. Unknown ids and bad arguments are the
    /// requester's problem and only logged at debug.
    fn from_error(e: VdqError) -> Self {
        if e.is_caller_error() {
            tracing::debug!("control request rejected: {}", e);
        } else {
            tracing::warn!("control request failed: {}", e);
        }
        Self::failed(e.to_string())
    }
}

/// Apply one request to `queue`. Used by the socket server and by the
/// offline fallback alike.
pub async fn handle_request(queue: &DownloadQueue, request: ControlRequest) -> ControlReply {
    match request {
        ControlRequest::Add {
            recipient,
            addressing,
            display,
        } => {
            let on_started: StartedCallback =
                Arc::new(|id: &str| tracing::info!(job_id = %id, "transfer started"));
            match queue
                .submit(recipient, addressing, display, Some(on_started))
                .await
            {
                Ok(id) => ControlReply::ok(id),
                Err(e) => ControlReply::from_error(e),
            }
        }
        ControlRequest::Stop { id } => match queue.stop(&id).await {
            Ok(()) => ControlReply::ok(format!("Stopped job {id}")),
            Err(e) => ControlReply::from_error(e),
        },
        ControlRequest::Rename {
            recipient,
            current,
            new_name,
        } => match queue.rename(&recipient, &current, &new_name).await {
            Ok(true) => ControlReply::ok(format!("Renamed {current} to {}", new_name.trim())),
            Ok(false) => ControlReply::failed(format!("No queued download named {current}")),
            Err(e) => ControlReply::from_error(e),
        },
        ControlRequest::Concurrency { n } => match queue.set_concurrency(n).await {
            Ok(()) => ControlReply::ok(format!("Concurrency set to {n}")),
            Err(e) => ControlReply::from_error(e),
        },
        ControlRequest::Status => ControlReply {
            status: Some(QueueView::from_queue(queue)),
            ..ControlReply::ok("")
        },
    }
}

/// Spawns a task that listens on `path` and applies each request line to `queue`.
/// Malformed lines get a failed reply.
pub fn spawn_control_listener(
    queue: DownloadQueue,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(&queue, stream).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(queue: &DownloadQueue, stream: UnixStream) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<ControlRequest>(line) {
            Ok(request) => {
                tracing::debug!(?request, "control request");
                handle_request(queue, request).await
            }
            Err(e) => ControlReply::failed(format!("malformed request: {e}")),
        };
        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        write.write_all(&out).await?;
    }
    Ok(())
}

/// Sends `request` to a running scheduler. `None` when no scheduler is
/// listening (missing or stale socket).
pub async fn send_request(socket_path: &Path, request: &ControlRequest) -> Result<Option<ControlReply>> {
    let stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
            tracing::debug!(path = %socket_path.display(), "no scheduler listening: {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let (read, mut write) = stream.into_split();
    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    write.write_all(&line).await?;
    let mut lines = BufReader::new(read).lines();
    let reply = lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow::anyhow!("scheduler closed the control socket without replying"))?;
    Ok(Some(serde_json::from_str(&reply)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdq_core::downloader::Downloader;
    use vdq_core::metadata::JobMetadataService;
    use vdq_core::sink::LogSink;
    use vdq_core::source::MemorySource;
    use vdq_core::store::MemoryStore;

    async fn held_queue(dir: &Path) -> DownloadQueue {
        let metadata = Arc::new(JobMetadataService::new(Arc::new(MemoryStore::new())));
        let queue = DownloadQueue::new(
            metadata,
            Downloader::new(Arc::new(MemorySource::new(1024)), dir),
            Arc::new(LogSink),
            Arc::new(LogSink),
            2,
        );
        queue.restore_held().await.unwrap();
        queue
    }

    fn add(name: &str) -> ControlRequest {
        ControlRequest::Add {
            recipient: Recipient::new("local"),
            addressing: AddressingInfo {
                channel: "films".into(),
                message_date: 1_700_000_000,
                file_size: 4096,
                extension: "mkv".into(),
            },
            display: DisplayInfo {
                file_name: name.into(),
                ..DisplayInfo::default()
            },
        }
    }

    #[test]
    fn request_wire_format() {
        let json = serde_json::to_string(&ControlRequest::Stop { id: "aB3_x-".into() }).unwrap();
        assert_eq!(json, r#"{"cmd":"stop","id":"aB3_x-"}"#);
        let parsed: ControlRequest = serde_json::from_str(r#"{"cmd":"concurrency","n":4}"#).unwrap();
        assert_eq!(parsed, ControlRequest::Concurrency { n: 4 });
    }

    #[test]
    fn queue_errors_become_failed_replies() {
        let rejected = ControlReply::from_error(VdqError::NotFound("job abc".into()));
        assert!(!rejected.ok);
        assert_eq!(rejected.message, "not found: job abc");
        let failed = ControlReply::from_error(VdqError::Transfer("reset".into()));
        assert!(!failed.ok);
        assert_eq!(failed.message, "transfer failed: reset");
    }

    #[tokio::test]
    async fn requests_edit_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let queue = held_queue(dir.path()).await;

        let first = handle_request(&queue, add("Heat")).await;
        assert!(first.ok, "{}", first.message);
        handle_request(&queue, add("Alien")).await;

        let renamed = handle_request(
            &queue,
            ControlRequest::Rename {
                recipient: Recipient::new("local"),
                current: "Heat".into(),
                new_name: "Heat 1995".into(),
            },
        )
        .await;
        assert!(renamed.ok);

        let stopped = handle_request(&queue, ControlRequest::Stop { id: first.message.clone() }).await;
        assert!(stopped.ok);
        let missing = handle_request(&queue, ControlRequest::Stop { id: first.message }).await;
        assert!(!missing.ok);
        assert!(missing.message.contains("not found"));

        let bad = handle_request(&queue, ControlRequest::Concurrency { n: 0 }).await;
        assert!(!bad.ok);

        let status = handle_request(&queue, ControlRequest::Status).await;
        let view = status.status.unwrap();
        assert_eq!(view.pending.len(), 1);
        assert_eq!(view.pending[0].name, "Alien");
        assert_eq!(view.pending[0].position, Some(1));
    }

    #[tokio::test]
    async fn socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.sock");
        let queue = held_queue(dir.path()).await;
        let server = spawn_control_listener(queue.clone(), &path).unwrap();

        let reply = send_request(&path, &add("Heat")).await.unwrap().unwrap();
        assert!(reply.ok);
        assert_eq!(queue.list_ids(), vec![reply.message.clone()]);

        let status = send_request(&path, &ControlRequest::Status).await.unwrap().unwrap();
        assert_eq!(status.status.unwrap().pending[0].id, reply.message);
        server.abort();
    }

    #[tokio::test]
    async fn missing_socket_means_no_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let reply = send_request(&dir.path().join("absent.sock"), &ControlRequest::Status)
            .await
            .unwrap();
        assert!(reply.is_none());
    }
}
