use std::future::Future;

use super::classify::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Awaits `f()` until it succeeds or the policy gives up, sleeping between attempts.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    tracing::debug!(what, attempt, error = %e, delay_ms = d.as_millis() as u64, "retrying");
                    tokio::time::sleep(d).await;
                    attempt += 1;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let out = run_with_retry(&fast(5), "part", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::Http(503))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_final_errors() {
        let calls = AtomicU32::new(0);
        let err = run_with_retry(&fast(5), "part", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(FetchError::Http(404)) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Http(404)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = run_with_retry(&fast(3), "part", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(FetchError::Truncated { expected: 8, received: 2 }) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Truncated { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
