use regex::Regex;

use super::{GroupHint, NameProposer, NamingRequest};
use crate::downloader::sanitize_file_name;
use crate::error::{Result, VdqError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Usable as a file name as-is: non-empty and unchanged by sanitizing.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && sanitize_file_name(name) == name
}

/// Full-match pattern an episode name must satisfy under `hint`.
pub fn episode_pattern(hint: &GroupHint) -> Result<Regex> {
    let group = regex::escape(&sanitize_file_name(&hint.group));
    let src = match hint.season {
        Some(season) => format!(r"^{group}_S{season:02}E\d{{1,4}}$"),
        None => format!(r"^{group}_\d{{1,4}}$"),
    };
    Regex::new(&src).map_err(|e| VdqError::InvalidArgument(format!("series {:?}: {e}", hint.group)))
}

pub struct ValidatedNamer<P> {
    proposer: P,
    max_attempts: u32,
}

impl<P: NameProposer> ValidatedNamer<P> {
    pub fn new(proposer: P) -> Self {
        Self {
            proposer,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Ask the proposer until a name validates, at most `max_attempts` times.
    pub async fn generate(&self, request: &NamingRequest) -> Result<String> {
        let pattern = request.hint.as_ref().map(episode_pattern).transpose()?;
        let mut last = String::from("no attempt made");
        for attempt in 1..=self.max_attempts {
            let name = match self.proposer.propose(request).await {
                Ok(name) => name.trim().to_string(),
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "name proposal failed");
                    last = e.to_string();
                    continue;
                }
            };
            let valid = is_safe_name(&name)
                && pattern.as_ref().map(|re| re.is_match(&name)).unwrap_or(true);
            tracing::debug!(attempt, name = %name, valid, "name proposed");
            if valid {
                return Ok(name);
            }
            last = format!("rejected {name:?}");
        }
        Err(VdqError::GenerationFailed {
            attempts: self.max_attempts,
            last,
        })
    }
}
