//! Retry and backoff for part fetches.
//!
//! Errors from the transport are classified into a small set of kinds;
//! the policy turns (attempt, kind) into either a delay or a give-up.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
