//! In-process source for tests and dry runs.
//!
//! Documents are byte vectors registered per channel. Individual documents
//! can be held so their stream parks before the next part, which lets a
//! caller observe a transfer mid-flight.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use super::resolve::{pick_document, ChannelMessage, MediaInfo, MediaKind};
use super::{ChunkStream, LocatedMedia, MediaSource};
use crate::error::{Result, VdqError};
use crate::job::AddressingInfo;

#[derive(Default)]
struct State {
    channels: HashMap<String, Vec<ChannelMessage>>,
    blobs: HashMap<String, Arc<Vec<u8>>>,
    held: HashSet<String>,
    fail_at: HashMap<String, u64>,
    opens: Vec<(String, u64)>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    release: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct MemorySource {
    shared: Arc<Shared>,
    part_size: usize,
}

impl MemorySource {
    pub fn new(part_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            part_size: part_size.max(1),
        }
    }

    /// Handle under which a document added with `add_document` is streamed.
    pub fn handle_for(channel: &str, date: i64) -> String {
        format!("{channel}/{date}")
    }

    /// Register a downloadable document; returns its handle.
    pub fn add_document(&self, channel: &str, date: i64, bytes: Vec<u8>) -> String {
        let size = bytes.len() as u64;
        self.add_document_declaring(channel, date, bytes, size)
    }

    /// Like `add_document`, but the listing advertises `declared_size`
    /// whatever the real length of `bytes` is.
    pub fn add_document_declaring(
        &self,
        channel: &str,
        date: i64,
        bytes: Vec<u8>,
        declared_size: u64,
    ) -> String {
        let handle = Self::handle_for(channel, date);
        let mut st = self.shared.lock();
        st.channels
            .entry(channel.to_string())
            .or_default()
            .push(ChannelMessage {
                date,
                media: Some(MediaInfo {
                    url: handle.clone(),
                    size: declared_size,
                    kind: MediaKind::Document,
                }),
            });
        st.blobs.insert(handle.clone(), Arc::new(bytes));
        handle
    }

    /// Register an arbitrary listing entry (text message, photo, ...).
    pub fn add_message(&self, channel: &str, message: ChannelMessage) {
        self.shared
            .lock()
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(message);
    }

    /// Park streams of `handle` before their next part until released.
    pub fn hold(&self, handle: &str) {
        self.shared.lock().held.insert(handle.to_string());
    }

    pub fn release(&self, handle: &str) {
        self.shared.lock().held.remove(handle);
        self.shared.release.notify_waiters();
    }

    /// Fail the stream of `handle` once it reaches byte `offset`.
    pub fn fail_at(&self, handle: &str, offset: u64) {
        self.shared.lock().fail_at.insert(handle.to_string(), offset);
    }

    /// Every `open` call so far as (handle, offset).
    pub fn opens(&self) -> Vec<(String, u64)> {
        self.shared.lock().opens.clone()
    }
}

#[async_trait]
impl MediaSource for MemorySource {
    async fn locate(&self, addressing: &AddressingInfo) -> Result<LocatedMedia> {
        let st = self.shared.lock();
        let messages = st
            .channels
            .get(&addressing.channel)
            .ok_or_else(|| VdqError::NotFound(format!("channel {}", addressing.channel)))?;
        let (msg, media) = pick_document(messages, addressing)?;
        Ok(LocatedMedia {
            total_size: media.size,
            handle: media.url.clone(),
            message_date: msg.date,
        })
    }

    async fn open(&self, media: &LocatedMedia, offset: u64) -> Result<Box<dyn ChunkStream>> {
        let data = {
            let mut st = self.shared.lock();
            st.opens.push((media.handle.clone(), offset));
            st.blobs
                .get(&media.handle)
                .cloned()
                .ok_or_else(|| VdqError::NotFound(media.handle.clone()))?
        };
        if offset > data.len() as u64 {
            return Err(VdqError::Transfer(format!(
                "offset {} past end of {} ({} bytes)",
                offset,
                media.handle,
                data.len()
            )));
        }
        Ok(Box::new(MemoryStream {
            shared: Arc::clone(&self.shared),
            handle: media.handle.clone(),
            data,
            pos: offset as usize,
            part_size: self.part_size,
        }))
    }
}

struct MemoryStream {
    shared: Arc<Shared>,
    handle: String,
    data: Arc<Vec<u8>>,
    pos: usize,
    part_size: usize,
}

#[async_trait]
impl ChunkStream for MemoryStream {
    async fn next_part(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let released = self.shared.release.notified();
            if !self.shared.lock().held.contains(&self.handle) {
                break;
            }
            released.await;
        }
        tokio::task::yield_now().await;

        if let Some(&fail) = self.shared.lock().fail_at.get(&self.handle) {
            if self.pos as u64 >= fail {
                return Err(VdqError::Transfer(format!(
                    "{}: connection reset at {}",
                    self.handle, self.pos
                )));
            }
        }
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.part_size).min(self.data.len());
        let part = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(part))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::fixtures;

    async fn drain(stream: &mut Box<dyn ChunkStream>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(part) = stream.next_part().await.unwrap() {
            out.extend(part);
        }
        out
    }

    #[tokio::test]
    async fn streams_from_offset_in_parts() {
        let src = MemorySource::new(4);
        src.add_document("moviechannel", 1_700_000_000, (0u8..10).collect());
        let media = src.locate(&fixtures::addressing(10)).await.unwrap();
        assert_eq!(media.total_size, 10);

        let mut stream = src.open(&media, 6).await.unwrap();
        assert_eq!(drain(&mut stream).await, vec![6, 7, 8, 9]);
        assert_eq!(src.opens(), vec![(media.handle.clone(), 6)]);
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let src = MemorySource::new(4);
        let err = src.locate(&fixtures::addressing(10)).await.unwrap_err();
        assert!(matches!(err, VdqError::NotFound(_)));
    }

    #[tokio::test]
    async fn held_stream_waits_for_release() {
        let src = MemorySource::new(2);
        let handle = src.add_document("moviechannel", 1_700_000_000, vec![1, 2, 3]);
        let media = src.locate(&fixtures::addressing(3)).await.unwrap();
        src.hold(&handle);
        let mut stream = src.open(&media, 0).await.unwrap();
        let task = tokio::spawn(async move { drain(&mut stream).await });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        src.release(&handle);
        assert_eq!(task.await.unwrap(), vec![1, 2, 3]);
    }
}
