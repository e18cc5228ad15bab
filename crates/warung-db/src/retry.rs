//! # Conflict Retry
//!
//! Bounded retry around a read-check-write unit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1 ──► Conflict ──► sleep(backoff) ──► attempt 2 ──► Ok        │
//! │                                                                         │
//! │  attempt n ──► Domain / NotFound / other ──► returned immediately      │
//! │                                                                         │
//! │  attempt max ──► Conflict ──► RetriesExhausted { attempts: max }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The closure must start from scratch on every call: open its own database
//! transaction, read live state, write, commit. A conflicted attempt has
//! already been rolled back when its error reaches this loop.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// How many times, and how patiently, to re-run a conflicted unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_backoff: Duration,

    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            ..Default::default()
        }
    }

    /// Sets the delay range.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Runs `unit` until it succeeds, fails for a non-conflict reason, or the
/// policy's attempts are used up.
///
/// `unit` receives the 1-based attempt number.
///
/// ## Example
/// ```rust,ignore
/// let tx = retry_on_conflict(&policy, "sale", |_| executor.attempt(&plan)).await?;
/// ```
pub async fn retry_on_conflict<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut unit: F,
) -> DbResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.create_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match unit(attempt).await {
            Err(err) if err.is_conflict() => {
                if attempt >= max_attempts {
                    warn!(operation, attempts = attempt, error = %err, "Retry budget exhausted");
                    return Err(DbError::RetriesExhausted { attempts: attempt });
                }

                let delay = backoff.next_backoff().unwrap_or(policy.max_backoff);
                warn!(operation, attempt, ?delay, error = %err, "Write conflict, retrying");
                tokio::time::sleep(delay).await;
            }
            other => {
                if attempt > 1 {
                    debug!(operation, attempt, ok = other.is_ok(), "Finished after retry");
                }
                return other;
            }
        }
    }
}
