//! Offline proposer: derives a name from the message's file name or caption.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::{NameProposer, NamingRequest};
use crate::downloader::sanitize_file_name;
use crate::error::{Result, VdqError};

/// Looks for `fileName`, then `caption`, then `messageId` in the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptionProposer;

fn episode_number(text: &str) -> Option<u32> {
    static EP: OnceLock<Option<Regex>> = OnceLock::new();
    let re = EP
        .get_or_init(|| Regex::new(r"(?i)(?:e|ep|episode)\s*(\d{1,4})\b|(\d{1,4})\D*$").ok())
        .as_ref()?;
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

fn base_text(context: &Value) -> Option<String> {
    let field = |k: &str| context.get(k).filter(|v| !v.is_null());
    if let Some(name) = field("fileName").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        let stem = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem,
            _ => name,
        };
        return Some(stem.to_string());
    }
    if let Some(caption) = field("caption").and_then(Value::as_str) {
        if let Some(line) = caption.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Some(line.to_string());
        }
    }
    field("messageId").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[async_trait]
impl NameProposer for CaptionProposer {
    async fn propose(&self, request: &NamingRequest) -> Result<String> {
        let context: Value = serde_json::from_str(&request.context_json)
            .map_err(|e| VdqError::InvalidArgument(format!("naming context: {e}")))?;
        let text = base_text(&context)
            .ok_or_else(|| VdqError::InvalidArgument("naming context has no usable text".into()))?;

        let Some(hint) = &request.hint else {
            return Ok(sanitize_file_name(&text));
        };
        let group = sanitize_file_name(&hint.group);
        let Some(ep) = episode_number(&text) else {
            return Ok(sanitize_file_name(&text));
        };
        Ok(match hint.season {
            Some(season) => format!("{group}_S{season:02}E{ep:02}"),
            None => format!("{group}_{ep:03}"),
        })
    }
}
