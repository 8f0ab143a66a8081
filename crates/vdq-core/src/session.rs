//! Per-recipient mode: plain movies, or episodes of one series.
//!
//! Each chat carries its own mode so two recipients can collect different
//! series at the same time.

use indicatif::{HumanBytes, HumanDuration};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::job::{DisplayInfo, Recipient};
use crate::naming::GroupHint;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatSession {
    #[default]
    Movie,
    Series { name: String, season: Option<u32> },
}

/// What the incoming message says about the file.
#[derive(Debug, Clone, Default)]
pub struct IncomingMedia {
    pub file_name: String,
    pub size: u64,
    pub duration_secs: u64,
    pub file_id: String,
}

impl ChatSession {
    pub fn series(name: impl Into<String>, season: Option<u32>) -> Self {
        ChatSession::Series {
            name: name.into(),
            season,
        }
    }

    pub fn series_name(&self) -> Option<&str> {
        match self {
            ChatSession::Movie => None,
            ChatSession::Series { name, .. } => Some(name),
        }
    }

    /// Naming constraint for new submissions in this mode.
    pub fn naming_hint(&self) -> Option<GroupHint> {
        match self {
            ChatSession::Movie => None,
            ChatSession::Series { name, season } => Some(GroupHint {
                group: name.clone(),
                season: *season,
            }),
        }
    }

    /// Display info for a submission made in this mode.
    pub fn display_info(&self, media: &IncomingMedia) -> DisplayInfo {
        DisplayInfo {
            file_name: media.file_name.clone(),
            file_size: HumanBytes(media.size).to_string(),
            duration: HumanDuration(Duration::from_secs(media.duration_secs)).to_string(),
            file_id: media.file_id.clone(),
            is_series: matches!(self, ChatSession::Series { .. }),
            series_name: self.series_name().map(str::to_string),
        }
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Recipient, ChatSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode for `recipient`; movie mode when never set.
    pub fn get(&self, recipient: &Recipient) -> ChatSession {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(recipient)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&self, recipient: &Recipient, session: ChatSession) {
        tracing::debug!(%recipient, ?session, "session mode changed");
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(recipient.clone(), session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> IncomingMedia {
        IncomingMedia {
            file_name: "ep".into(),
            size: 2048,
            duration_secs: 90,
            file_id: "f1".into(),
        }
    }

    #[test]
    fn movie_mode_display() {
        let info = ChatSession::Movie.display_info(&media());
        assert!(!info.is_series);
        assert!(info.series_name.is_none());
        assert_eq!(info.file_size, HumanBytes(2048).to_string());
        assert_eq!(info.file_id, "f1");
        assert!(ChatSession::Movie.naming_hint().is_none());
    }

    #[test]
    fn series_mode_display_and_hint() {
        let s = ChatSession::series("Dark", Some(2));
        let info = s.display_info(&media());
        assert!(info.is_series);
        assert_eq!(info.series_name.as_deref(), Some("Dark"));
        assert_eq!(
            s.naming_hint(),
            Some(GroupHint {
                group: "Dark".into(),
                season: Some(2)
            })
        );
    }

    #[test]
    fn registry_is_per_recipient() {
        let reg = SessionRegistry::new();
        let a = Recipient::new("a");
        let b = Recipient::new("b");
        reg.set(&a, ChatSession::series("Dark", None));
        assert_eq!(reg.get(&a).series_name(), Some("Dark"));
        assert_eq!(reg.get(&b), ChatSession::Movie);
        reg.set(&a, ChatSession::Movie);
        assert_eq!(reg.get(&a), ChatSession::Movie);
    }
}
