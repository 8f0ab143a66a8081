//! Chunked media sources: where the bytes of a job come from.
//!
//! A source first locates the message named by a job's addressing info,
//! then streams its document from a byte offset in fixed-size parts.

mod http;
mod memory;
pub mod resolve;

pub use http::HttpChannelSource;
pub use memory::MemorySource;
pub use resolve::{pick_message, ChannelMessage, MediaInfo, MediaKind};

use async_trait::async_trait;

use crate::error::Result;
use crate::job::AddressingInfo;

/// A document found on the source. `total_size` is fixed for the life of the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedMedia {
    pub total_size: u64,
    /// Source-specific handle (a URL for HTTP channels).
    pub handle: String,
    /// Timestamp of the message actually used, which may differ from the requested one.
    pub message_date: i64,
}

/// Parts of one document, in order, starting at the offset passed to `open`.
#[async_trait]
pub trait ChunkStream: Send {
    /// Next part, or `None` at end of stream.
    async fn next_part(&mut self) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Find the document for `addressing`. Fails `NotFound` when the channel
    /// has no media at all and `InvalidMedia` when the match is not a document.
    async fn locate(&self, addressing: &AddressingInfo) -> Result<LocatedMedia>;

    /// Stream `media` from byte `offset` to the end.
    async fn open(&self, media: &LocatedMedia, offset: u64) -> Result<Box<dyn ChunkStream>>;
}
