//! Error of a single part or index fetch, kept separate so it can be
//! classified before it is folded into `VdqError::Transfer`.

use std::fmt;

use crate::error::VdqError;

#[derive(Debug)]
pub enum FetchError {
    Curl(curl::Error),
    /// Non-2xx status.
    Http(u32),
    /// A ranged GET was answered with the whole file.
    RangeIgnored,
    /// Body shorter than the requested range.
    Truncated { expected: u64, received: u64 },
    /// Body longer than the requested range.
    Overrun { expected: u64, received: u64 },
    /// The blocking worker could not be joined.
    Worker(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::RangeIgnored => write!(f, "server ignored the Range header (HTTP 200, expected 206)"),
            FetchError::Truncated { expected, received } => {
                write!(f, "short body: expected {} bytes, got {}", expected, received)
            }
            FetchError::Overrun { expected, received } => {
                write!(f, "body overrun: expected {} bytes, got {}", expected, received)
            }
            FetchError::Worker(msg) => write!(f, "fetch worker: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            _ => None,
        }
    }
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}

impl From<FetchError> for VdqError {
    fn from(e: FetchError) -> Self {
        VdqError::Transfer(e.to_string())
    }
}
