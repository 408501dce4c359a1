//! Retry-until-success bootstrap used by both store clients.
//!
//! The service refuses to serve anything until its backing stores answer, so
//! the default policy retries forever at a fixed interval. Liveness and
//! restart decisions belong to whatever supervises the process.

use std::{fmt, time::Duration};
use thiserror::Error;
use tokio_retry::{Retry, strategy::FixedInterval};
use tracing::{info, warn};

/// Fixed pause between connection attempts.
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How often and how long `connect_with_retry` keeps trying.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: CONNECT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts: one fewer than the number of attempts.
    fn strategy(&self) -> std::iter::Take<FixedInterval> {
        let retries = self
            .max_attempts
            .map_or(usize::MAX, |max| max.saturating_sub(1) as usize);
        FixedInterval::new(self.interval).take(retries)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up on {target} after {attempts} attempts: {last}")]
    Exhausted {
        target: String,
        attempts: u32,
        last: E,
    },
}

/// Invoke `attempt` until it succeeds, waiting `policy.interval` after every
/// failure. Each failure is logged. Only returns an error when the policy
/// carries a maximum attempt count and it is reached.
pub async fn connect_with_retry<T, E, F, Fut>(
    target: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    info!("Initialising {}...", target);
    let mut attempts: u32 = 0;
    let interval = policy.interval;

    let result = Retry::spawn(policy.strategy(), || {
        attempts += 1;
        let n = attempts;
        let pending = attempt();
        async move {
            let outcome = pending.await;
            if let Err(err) = &outcome {
                warn!(
                    attempt = n,
                    error = %err,
                    "Error connecting to {}, retrying in {:?}",
                    target,
                    interval
                );
            }
            outcome
        }
    })
    .await;

    match result {
        Ok(value) => {
            info!("{} initialised after {} attempt(s)", target, attempts);
            Ok(value)
        }
        Err(last) => Err(RetryError::Exhausted {
            target: target.to_string(),
            attempts,
            last,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fails_twice_then_returns_the_success_value() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let value = connect_with_retry("store", &RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("connection refused")
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two failures, two one-second pauses.
        let waited = start.elapsed();
        assert!(waited >= 2 * CONNECT_RETRY_INTERVAL, "{:?}", waited);
        assert!(waited < 3 * CONNECT_RETRY_INTERVAL, "{:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_never_waits() {
        let start = Instant::now();
        let value: Result<&str, RetryError<String>> =
            connect_with_retry("store", &RetryPolicy::default(), || async { Ok("ready") }).await;

        assert_eq!(value.unwrap(), "ready");
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_gives_up_with_the_last_error() {
        let policy = RetryPolicy {
            interval: Duration::from_millis(5),
            max_attempts: Some(3),
        };
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = connect_with_retry("store", &policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("refused #{}", n)) }
        })
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "refused #3");
            }
            Ok(()) => panic!("expected exhaustion"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No pause after the final attempt.
        assert!(start.elapsed() < Duration::from_millis(15));
    }

    #[test]
    fn unbounded_policy_keeps_producing_delays() {
        let mut delays = RetryPolicy::default().strategy();
        for _ in 0..1000 {
            assert_eq!(delays.next(), Some(CONNECT_RETRY_INTERVAL));
        }
    }

    #[test]
    fn bounded_policy_yields_one_delay_fewer_than_attempts() {
        let policy = RetryPolicy {
            interval: Duration::from_millis(5),
            max_attempts: Some(4),
        };
        assert_eq!(policy.strategy().count(), 3);
    }
}
