//! Map HTTP statuses and curl errors onto retry kinds.

use super::error::FetchError;
use super::policy::ErrorKind;

pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Curl(ce) => classify_curl_error(ce),
        FetchError::Http(code) => classify_http_status(*code),
        FetchError::Truncated { .. } => ErrorKind::Connection,
        FetchError::Overrun { .. } | FetchError::RangeIgnored | FetchError::Worker(_) => {
            ErrorKind::Other
        }
    }
}
