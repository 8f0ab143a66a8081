use std::time::Duration;

/// Coarse error classes the policy knows how to treat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or low-speed timeout.
    Timeout,
    /// 429 / 503.
    Throttled,
    /// Reset, refused, DNS, short body.
    Connection,
    /// Other 5xx.
    Http5xx(u16),
    /// Not worth retrying (4xx, local I/O, malformed data).
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff with a cap on both attempts and delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per part, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No retries at all; used by tests and one-shot index fetches.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `attempt` is 1-based. Delay is `base * 2^(attempt-1)`, capped at `max_delay`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => {
                let factor = 1u32 << attempt.saturating_sub(1).min(8);
                let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}
