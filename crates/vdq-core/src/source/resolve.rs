//! Picking the message a job refers to.
//!
//! Exact timestamp matches win. When none exists the message closest in
//! time is substituted; equal distances prefer the one whose size matches
//! the job, then the earlier message. Messages without media never match.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VdqError};
use crate::job::AddressingInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Document,
    Photo,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub url: String,
    pub size: u64,
    pub kind: MediaKind,
}

/// One entry of a channel listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
}

/// The message `addressing` refers to, or the closest substitute.
pub fn pick_message<'a>(
    messages: &'a [ChannelMessage],
    addressing: &AddressingInfo,
) -> Result<&'a ChannelMessage> {
    let target = addressing.message_date;
    let size = addressing.file_size;
    let picked = messages
        .iter()
        .filter(|m| m.media.is_some())
        .min_by_key(|m| {
            let size_mismatch = m.media.as_ref().map(|md| md.size != size).unwrap_or(true);
            (m.date.abs_diff(target), size_mismatch, m.date)
        })
        .ok_or_else(|| {
            VdqError::NotFound(format!("no media in channel {}", addressing.channel))
        })?;

    if picked.date != target {
        tracing::warn!(
            channel = %addressing.channel,
            requested = target,
            used = picked.date,
            "message not found, substituting closest by timestamp"
        );
    }
    Ok(picked)
}

/// Like `pick_message`, but also requires the match to be a document.
pub fn pick_document<'a>(
    messages: &'a [ChannelMessage],
    addressing: &AddressingInfo,
) -> Result<(&'a ChannelMessage, &'a MediaInfo)> {
    let msg = pick_message(messages, addressing)?;
    match &msg.media {
        Some(media) if media.kind == MediaKind::Document => Ok((msg, media)),
        _ => Err(VdqError::InvalidMedia(format!(
            "message {} in {}",
            msg.date, addressing.channel
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::fixtures;

    fn doc(date: i64, size: u64) -> ChannelMessage {
        ChannelMessage {
            date,
            media: Some(MediaInfo {
                url: format!("m/{date}.mp4"),
                size,
                kind: MediaKind::Document,
            }),
        }
    }

    fn addressing(date: i64, size: u64) -> AddressingInfo {
        let mut a = fixtures::addressing(size);
        a.message_date = date;
        a
    }

    #[test]
    fn exact_match_wins() {
        let msgs = vec![doc(90, 10), doc(100, 10), doc(101, 10)];
        assert_eq!(pick_message(&msgs, &addressing(100, 10)).unwrap().date, 100);
    }

    #[test]
    fn closest_timestamp_is_substituted() {
        let msgs = vec![doc(50, 10), doc(97, 10), doc(110, 10)];
        assert_eq!(pick_message(&msgs, &addressing(100, 10)).unwrap().date, 97);
    }

    #[test]
    fn equal_distance_prefers_matching_size() {
        let msgs = vec![doc(95, 1), doc(105, 10)];
        assert_eq!(pick_message(&msgs, &addressing(100, 10)).unwrap().date, 105);
        let msgs = vec![doc(95, 1), doc(105, 1)];
        assert_eq!(pick_message(&msgs, &addressing(100, 10)).unwrap().date, 95);
    }

    #[test]
    fn text_messages_are_ignored() {
        let msgs = vec![ChannelMessage { date: 100, media: None }, doc(200, 10)];
        assert_eq!(pick_message(&msgs, &addressing(100, 10)).unwrap().date, 200);
        let none = vec![ChannelMessage { date: 100, media: None }];
        assert!(matches!(
            pick_message(&none, &addressing(100, 10)),
            Err(VdqError::NotFound(_))
        ));
    }

    #[test]
    fn photos_are_not_documents() {
        let msgs = vec![ChannelMessage {
            date: 100,
            media: Some(MediaInfo {
                url: "p.jpg".into(),
                size: 10,
                kind: MediaKind::Photo,
            }),
        }];
        assert!(matches!(
            pick_document(&msgs, &addressing(100, 10)),
            Err(VdqError::InvalidMedia(_))
        ));
    }

    #[test]
    fn unknown_kinds_parse_as_other() {
        let m: ChannelMessage =
            serde_json::from_str(r#"{"date":1,"media":{"url":"x","size":2,"kind":"sticker"}}"#).unwrap();
        assert_eq!(m.media.unwrap().kind, MediaKind::Other);
    }
}
