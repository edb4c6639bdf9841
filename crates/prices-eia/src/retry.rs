//! Retrying JSON fetch.

use std::time::Duration;

use prices_core::{HttpSession, Result};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, warn};

/// Bounded exponential backoff for transient request failures.
///
/// The wait before attempt `n + 1` is `multiplier * 2^(n - 1)`, clamped to
/// `[min_delay, max_delay]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base of the exponential wait.
    pub multiplier: Duration,
    /// Lower bound of a single wait.
    pub min_delay: Duration,
    /// Upper bound of a single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Returns the wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(factor)
            .max(self.min_delay)
            .min(self.max_delay)
    }
}

/// Issues a GET through `session` and decodes the JSON body, retrying
/// transient failures with the default [`RetryPolicy`].
///
/// # Errors
/// Returns the last error unchanged once attempts are exhausted, or the first
/// non-transient error immediately.
pub async fn get_json<S: HttpSession + ?Sized>(
    session: &S,
    url: &str,
    params: &[(String, String)],
    timeout: Duration,
) -> Result<Value> {
    get_json_with_policy(session, url, params, timeout, &RetryPolicy::default()).await
}

/// [`get_json`] with an explicit retry policy.
///
/// # Errors
/// See [`get_json`].
pub async fn get_json_with_policy<S: HttpSession + ?Sized>(
    session: &S,
    url: &str,
    params: &[(String, String)],
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<Value> {
    let mut attempt = 1;

    loop {
        match session.get(url, params, timeout).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, policy.max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    error!("Request failed after {} attempts: {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prices_core::DataError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Session that plays back a fixed sequence of outcomes.
    #[derive(Debug)]
    struct ScriptedSession {
        outcomes: Mutex<VecDeque<Result<Value>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSession {
        fn new(outcomes: Vec<Result<Value>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpSession for ScriptedSession {
        async fn get(
            &self,
            _url: &str,
            _params: &[(String, String)],
            _timeout: Duration,
        ) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DataError::Other("script exhausted".to_string())))
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            multiplier: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30]);
        assert_eq!(policy.delay_for(40), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let session = ScriptedSession::new(vec![
            Err(DataError::Network("connection reset".to_string())),
            Err(DataError::Timeout("timed out".to_string())),
            Ok(json!({"response": {"total": 0}})),
        ]);

        let value = get_json_with_policy(&session, "u", &[], Duration::from_secs(1), &fast_policy(6))
            .await
            .unwrap();

        assert_eq!(value, json!({"response": {"total": 0}}));
        assert_eq!(session.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let session = ScriptedSession::new(vec![
            Err(DataError::HttpStatus {
                status: 403,
                url: "u".to_string(),
            }),
            Ok(json!({})),
        ]);

        let result =
            get_json_with_policy(&session, "u", &[], Duration::from_secs(1), &fast_policy(6)).await;

        assert!(matches!(result, Err(DataError::HttpStatus { status: 403, .. })));
        assert_eq!(session.calls(), 1);
    }

    #[tokio::test]
    async fn test_final_failure_returned_unchanged() {
        let session = ScriptedSession::new(vec![
            Err(DataError::Network("first".to_string())),
            Err(DataError::HttpStatus {
                status: 502,
                url: "u".to_string(),
            }),
            Err(DataError::Network("last".to_string())),
            Ok(json!({})),
        ]);

        let result =
            get_json_with_policy(&session, "u", &[], Duration::from_secs(1), &fast_policy(3)).await;

        match result {
            Err(DataError::Network(msg)) => assert_eq!(msg, "last"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(session.calls(), 3);
    }
}
