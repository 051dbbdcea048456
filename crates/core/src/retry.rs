//! Fixed-delay retry policy for orchestration attempts.

use std::time::Duration;

/// Tunable parameters for the bounded retry of failed attempts.
///
/// Only faults raised by the orchestration itself are retried; a failure
/// the remote service reported is terminal and never re-attempted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt may follow the given 1-based attempt number.
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
