//! Job id generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::JobId;

const ID_LEN: usize = 6;

/// Six URL-safe characters taken from a random v4 UUID.
pub fn new_job_id() -> JobId {
    let encoded = URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes());
    encoded[..ID_LEN].to_string()
}

/// Draws ids until one is not `taken`.
pub fn unique_job_id(taken: impl Fn(&str) -> bool) -> JobId {
    loop {
        let id = new_job_id();
        if !taken(&id) {
            return id;
        }
        tracing::debug!(job_id = %id, "job id collision, drawing again");
    }
}
