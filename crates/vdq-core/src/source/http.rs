//! HTTP channel source: `<base>/<channel>/index.json` lists the channel's
//! messages; documents are fetched in parts with Range GETs via libcurl.
//!
//! curl is blocking, so every request runs on `spawn_blocking`.

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::resolve::{pick_document, ChannelMessage};
use super::{ChunkStream, LocatedMedia, MediaSource};
use crate::error::{Result, VdqError};
use crate::job::AddressingInfo;
use crate::retry::{run_with_retry, FetchError, RetryPolicy};

/// Index files larger than this are rejected.
const MAX_INDEX_BYTES: usize = 16 * 1024 * 1024;

pub struct HttpChannelSource {
    base: Url,
    part_size: u64,
    retry: RetryPolicy,
}

impl HttpChannelSource {
    /// `base` is the directory holding one sub-directory per channel.
    pub fn new(base: &str, part_size: u64, retry: RetryPolicy) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| VdqError::InvalidArgument(format!("source base url {base:?}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            part_size: part_size.max(1),
            retry,
        })
    }

    fn index_url(&self, channel: &str) -> Result<Url> {
        self.base
            .join(&format!("{}/index.json", channel.trim_matches('/')))
            .map_err(|e| VdqError::InvalidArgument(format!("channel {channel:?}: {e}")))
    }

    async fn fetch_index(&self, channel: &str) -> Result<(Url, Vec<ChannelMessage>)> {
        let url = self.index_url(channel)?;
        let body = run_with_retry(&self.retry, "index", || {
            let u = url.to_string();
            async move { blocking(move || get_body(&u, None)).await }
        })
        .await
        .map_err(|e| match e {
            FetchError::Http(404) => VdqError::NotFound(format!("channel {channel}")),
            other => other.into(),
        })?;
        let messages: Vec<ChannelMessage> = serde_json::from_slice(&body)
            .map_err(|e| VdqError::Transfer(format!("{url}: malformed index: {e}")))?;
        Ok((url, messages))
    }
}

#[async_trait]
impl MediaSource for HttpChannelSource {
    async fn locate(&self, addressing: &AddressingInfo) -> Result<LocatedMedia> {
        let (index_url, messages) = self.fetch_index(&addressing.channel).await?;
        let (msg, media) = pick_document(&messages, addressing)?;
        let url = index_url
            .join(&media.url)
            .map_err(|e| VdqError::InvalidMedia(format!("media url {:?}: {e}", media.url)))?;
        tracing::debug!(channel = %addressing.channel, date = msg.date, %url, size = media.size, "located media");
        Ok(LocatedMedia {
            total_size: media.size,
            handle: url.to_string(),
            message_date: msg.date,
        })
    }

    async fn open(&self, media: &LocatedMedia, offset: u64) -> Result<Box<dyn ChunkStream>> {
        if offset > media.total_size {
            return Err(VdqError::Transfer(format!(
                "offset {} past end of {} ({} bytes)",
                offset, media.handle, media.total_size
            )));
        }
        Ok(Box::new(HttpPartStream {
            url: media.handle.clone(),
            pos: offset,
            total: media.total_size,
            part_size: self.part_size,
            retry: self.retry,
        }))
    }
}

struct HttpPartStream {
    url: String,
    pos: u64,
    total: u64,
    part_size: u64,
    retry: RetryPolicy,
}

#[async_trait]
impl ChunkStream for HttpPartStream {
    async fn next_part(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.total {
            return Ok(None);
        }
        let start = self.pos;
        let len = self.part_size.min(self.total - start);
        let url = self.url.clone();
        let part = run_with_retry(&self.retry, "part", || {
            let u = url.clone();
            async move { blocking(move || get_body(&u, Some((start, len)))).await }
        })
        .await?;
        self.pos += part.len() as u64;
        Ok(Some(part))
    }
}

async fn blocking<T, F>(f: F) -> std::result::Result<T, FetchError>
where
    F: FnOnce() -> std::result::Result<T, FetchError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FetchError::Worker(e.to_string()))?
}

/// GET `url`, optionally restricted to `len` bytes at `start`.
/// A ranged GET must be answered with 206 and exactly `len` bytes; servers
/// that ignore Range cannot be used for part transfers.
fn get_body(url: &str, range: Option<(u64, u64)>) -> std::result::Result<Vec<u8>, FetchError> {
    let limit = match range {
        Some((_, len)) => len as usize,
        None => MAX_INDEX_BYTES,
    };
    let mut body: Vec<u8> = Vec::with_capacity(limit.min(1024 * 1024));
    let mut overflow = 0u64;

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    // Abort if throughput stays below 1 KiB/s for 60s; this bounds how long a stop can wait.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    if let Some((start, len)) = range {
        easy.range(&format!("{}-{}", start, start + len.saturating_sub(1)))?;
    }

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > limit {
                overflow += data.len() as u64;
                return Ok(0);
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    let code = easy.response_code()?;
    if range.is_some() && code == 200 {
        return Err(FetchError::RangeIgnored);
    }
    if let Err(e) = performed {
        if e.is_write_error() && overflow > 0 {
            if !(200..300).contains(&code) {
                return Err(FetchError::Http(code));
            }
            return Err(FetchError::Overrun {
                expected: limit as u64,
                received: body.len() as u64 + overflow,
            });
        }
        return Err(FetchError::Curl(e));
    }
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    if let Some((_, len)) = range {
        if code != 206 {
            return Err(FetchError::Http(code));
        }
        let received = body.len() as u64;
        if received < len {
            return Err(FetchError::Truncated { expected: len, received });
        }
    }
    Ok(body)
}
