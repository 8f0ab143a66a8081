//! File naming: a proposer suggests a name from the message context and
//! `ValidatedNamer` keeps asking until the suggestion is acceptable.

mod caption;
mod validate;

pub use caption::CaptionProposer;
pub use validate::{episode_pattern, is_safe_name, ValidatedNamer};

use async_trait::async_trait;

use crate::error::Result;

/// Series context for a name: proposals must follow `<Group>_<episode>`
/// (or `<Group>_SxxE<episode>` when a season is set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHint {
    pub group: String,
    pub season: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct NamingRequest {
    /// JSON describing the incoming message (file name, caption, ids, dates).
    pub context_json: String,
    /// Series that already exist in the library.
    pub known_groups: Vec<String>,
    pub hint: Option<GroupHint>,
}

/// One naming attempt. May be non-deterministic (e.g. a language model).
#[async_trait]
pub trait NameProposer: Send + Sync {
    async fn propose(&self, request: &NamingRequest) -> Result<String>;
}
