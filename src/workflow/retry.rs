//! Bounded Retry with Escalation
//!
//! One combinator shared by every per-section unit of work:
//!
//! 1. Up to `max_retries` attempts with unchanged input, exponential backoff between them
//! 2. After the last ordinary failure, one recovery call that may propose a replacement input
//! 3. With a replacement, exactly one more attempt
//!
//! Attempts are strictly sequential.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::constants::retry as retry_constants;
use crate::types::{QuillError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Ordinary attempts before escalating to recovery (at least 1)
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            min_delay: Duration::from_millis(retry_constants::MIN_DELAY_MS),
            max_delay: Duration::from_millis(retry_constants::MAX_DELAY_MS),
            jitter: true,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            min_delay: Duration::from_millis(config.retry_min_delay_ms),
            max_delay: Duration::from_millis(
                config.retry_max_delay_ms.max(config.retry_min_delay_ms),
            ),
            jitter: config.retry_min_delay_ms > 0,
        }
    }

    /// No sleeping between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Upper bound on attempts including the recovery attempt
    pub fn attempt_ceiling(&self) -> u32 {
        self.max_retries + 1
    }

    fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(retry_constants::BACKOFF_FACTOR)
            .with_max_times(self.max_retries as usize);
        if self.jitter {
            builder = builder.with_jitter();
        }
        builder.build()
    }
}

/// Result of one retried unit of work
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    /// Attempts actually made
    pub attempts: u32,
    /// Whether a recovery-substituted input was attempted
    pub recovered: bool,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `attempt` with bounded retries, escalating once to `recover`
///
/// `recover` receives the original input and the last failure text. Returning
/// `Some(input)` buys one extra attempt with that input; `None` ends the unit
/// with the last ordinary error.
pub async fn retry_with_escalation<I, T, A, AF, R, RF>(
    policy: &RetryPolicy,
    input: I,
    mut attempt: A,
    recover: R,
) -> RetryOutcome<T>
where
    I: Clone,
    A: FnMut(I) -> AF,
    AF: Future<Output = Result<T>>,
    R: FnOnce(I, String) -> RF,
    RF: Future<Output = Option<I>>,
{
    let mut delays = policy.delays();
    let mut attempts = 0u32;
    let mut last_error: Option<QuillError> = None;

    while attempts < policy.max_retries {
        if attempts > 0 {
            let delay = delays.next().unwrap_or(policy.max_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        attempts += 1;
        match attempt(input.clone()).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                    recovered: false,
                };
            }
            Err(e) => {
                debug!(attempt = attempts, max = policy.max_retries, error = %e, "Attempt failed");
                last_error = Some(e);
            }
        }
    }

    let error = last_error
        .unwrap_or_else(|| QuillError::Config("retry policy allowed no attempts".into()));

    let Some(replacement) = recover(input, error.to_string()).await else {
        return RetryOutcome {
            result: Err(error),
            attempts,
            recovered: false,
        };
    };

    attempts += 1;
    debug!(attempt = attempts, "Attempting with recovered input");
    RetryOutcome {
        result: attempt(replacement).await,
        attempts,
        recovered: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fail(msg: &str) -> QuillError {
        QuillError::llm(ErrorCategory::Transient, msg)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(3);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = retry_with_escalation(
            &policy,
            "q".to_string(),
            |input: String| {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(fail("flaky")) } else { Ok(input.len()) }
                }
            },
            |_, _| async { None },
        )
        .await;

        assert_eq!(outcome.result.unwrap(), 1);
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.recovered);
    }

    #[tokio::test]
    async fn test_recovery_grants_exactly_one_more_attempt() {
        let policy = RetryPolicy::immediate(3);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let outcome = retry_with_escalation(
            &policy,
            "original".to_string(),
            |input: String| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(input.clone());
                    Err::<(), _>(fail("always"))
                }
            },
            |_, reason| async move {
                assert!(reason.contains("always"));
                Some("improved".to_string())
            },
        )
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.recovered);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["original", "original", "original", "improved"]
        );
    }

    #[tokio::test]
    async fn test_recovery_success() {
        let policy = RetryPolicy::immediate(2);
        let outcome = retry_with_escalation(
            &policy,
            0u32,
            |input: u32| async move {
                if input == 0 { Err(fail("bad input")) } else { Ok(input) }
            },
            |_, _| async { Some(7) },
        )
        .await;

        assert_eq!(outcome.result.unwrap(), 7);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.recovered);
    }

    #[tokio::test]
    async fn test_no_replacement_keeps_last_error() {
        let policy = RetryPolicy::immediate(2);
        let outcome = retry_with_escalation(
            &policy,
            (),
            |_| async { Err::<(), _>(fail("nope")) },
            |_, _| async { None },
        )
        .await;

        assert_eq!(outcome.attempts, 2);
        assert!(!outcome.recovered);
        assert!(outcome.result.unwrap_err().to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy {
            max_retries: 3,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            jitter: false,
        };
        let start = std::time::Instant::now();

        let outcome = retry_with_escalation(
            &policy,
            (),
            |_| async { Err::<(), _>(fail("x")) },
            |_, _| async { None },
        )
        .await;

        assert_eq!(outcome.attempts, 3);
        // 10ms + 20ms between the three attempts
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_retries_is_clamped() {
        assert_eq!(RetryPolicy::immediate(0).max_retries, 1);
        assert_eq!(RetryPolicy::new(3).attempt_ceiling(), 4);
    }
}
