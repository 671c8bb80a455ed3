//! Bounded retry with a fixed inter-attempt delay.
//!
//! Both connections dial through `retry_fixed`. The attempt count is
//! bounded so that an unreachable peer escalates to a fatal error instead
//! of retrying forever.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::ConnectionRetriesConfig;
use crate::lifecycle::Shutdown;

/// Retry policy derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&ConnectionRetriesConfig> for RetryPolicy {
    fn from(config: &ConnectionRetriesConfig) -> Self {
        Self {
            max_attempts: config.max.max(1),
            delay: Duration::from_millis(config.sleep_duration),
        }
    }
}

/// Why `retry_fixed` gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last error.
    Exhausted { attempts: u32, last: E },
    /// The cancellation token fired between attempts.
    Cancelled,
}

/// Run `op` until it succeeds, the attempt budget is spent, or `cancel`
/// fires.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: RetryPolicy,
    cancel: &Shutdown,
    what: &'static str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        if cancel.is_triggered() {
            return Err(RetryError::Cancelled);
        }
        attempt += 1;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = op(attempt) => result,
        };
        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        tracing::warn!(
            what,
            attempt,
            max_attempts = policy.max_attempts,
            error = %err,
            "Attempt failed"
        );

        if attempt >= policy.max_attempts {
            return Err(RetryError::Exhausted { attempts: attempt, last: err });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry_fixed(policy(5), &Shutdown::new(), "dial", move |_| {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("refused")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let result: Result<(), _> =
            retry_fixed(policy(3), &Shutdown::new(), "dial", |_| async { Err("refused") }).await;

        assert_eq!(result, Err(RetryError::Exhausted { attempts: 3, last: "refused" }));
    }

    #[tokio::test]
    async fn test_cancel_stops_retrying() {
        let cancel = Shutdown::new();
        cancel.trigger();
        let result: Result<(), RetryError<&str>> =
            retry_fixed(policy(3), &cancel, "dial", |_| async { Err("refused") }).await;

        assert_eq!(result, Err(RetryError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_hung_attempt() {
        let cancel = Shutdown::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let result: Result<(), RetryError<&str>> = tokio::time::timeout(
            Duration::from_secs(1),
            retry_fixed(policy(3), &cancel, "dial", |_| std::future::pending()),
        )
        .await
        .unwrap();
        assert_eq!(result, Err(RetryError::Cancelled));
    }

    #[test]
    fn test_policy_from_config() {
        let config = ConnectionRetriesConfig {
            max: 0,
            sleep_duration: 250,
            refresh_interval: 0,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }
}
