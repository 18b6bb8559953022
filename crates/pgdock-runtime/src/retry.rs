//! Fixed-schedule retries bounded by a wall-clock budget.

use std::fmt;
use std::time::{Duration, Instant};

/// How long to keep retrying and how long to pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total time budget. At least one attempt is always made.
    pub max_wait: Duration,
    /// Pause between two attempts.
    pub interval: Duration,
}

/// The retry budget ran out before any attempt succeeded.
#[derive(Debug)]
pub struct RetryTimeout<E> {
    /// Attempts made.
    pub attempts: u32,
    /// Time spent retrying.
    pub elapsed: Duration,
    /// Error of the last attempt.
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryTimeout<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reached retry deadline after {:?} ({} attempts): {}",
            self.elapsed, self.attempts, self.last
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryTimeout<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Calls `op` until it succeeds or the next attempt would start past the
/// budget.
///
/// # Errors
///
/// Returns [`RetryTimeout`] with the last error once the budget is spent.
pub fn retry<T, E, F>(policy: RetryPolicy, mut op: F) -> Result<T, RetryTimeout<E>>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let start = Instant::now();
    let mut attempts = 0_u32;
    loop {
        attempts = attempts.saturating_add(1);
        match op() {
            Ok(value) => {
                tracing::debug!(attempts, elapsed = ?start.elapsed(), "attempt succeeded");
                return Ok(value);
            }
            Err(err) => {
                let elapsed = start.elapsed();
                if elapsed + policy.interval > policy.max_wait {
                    return Err(RetryTimeout {
                        attempts,
                        elapsed,
                        last: err,
                    });
                }
                tracing::debug!(attempts, error = %err, "attempt failed, retrying");
                std::thread::sleep(policy.interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: RetryPolicy = RetryPolicy {
        max_wait: Duration::from_secs(5),
        interval: Duration::from_millis(1),
    };

    #[test]
    fn returns_first_success() {
        let mut calls = 0;
        let value = retry(FAST, || {
            calls += 1;
            if calls < 3 { Err("not yet") } else { Ok(calls) }
        })
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_budget_makes_exactly_one_attempt() {
        let policy = RetryPolicy {
            max_wait: Duration::ZERO,
            interval: Duration::from_millis(10),
        };
        let mut calls = 0;
        let err = retry(policy, || -> Result<(), _> {
            calls += 1;
            Err("refused")
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.attempts, 1);
        assert_eq!(err.last, "refused");
    }

    #[test]
    fn timeout_keeps_last_error() {
        let policy = RetryPolicy {
            max_wait: Duration::from_millis(30),
            interval: Duration::from_millis(5),
        };
        let mut calls = 0;
        let err = retry(policy, || -> Result<(), String> {
            calls += 1;
            Err(format!("failure {calls}"))
        })
        .unwrap_err();
        assert!(err.attempts > 1);
        assert_eq!(err.last, format!("failure {}", err.attempts));
        assert!(err.to_string().starts_with("reached retry deadline after"));
    }
}
