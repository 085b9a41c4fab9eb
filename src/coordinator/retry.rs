//! Backoff policy for automatically retrying failed reads.
//!
//! Writes are never retried: resubmitting a create could charge or record
//! the same thing twice.

use std::time::Duration;

use crate::Error;

/// Exponential backoff: the delay before retry `n` (counting from zero) is
/// `base_delay * 2^n`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How many times a read is retried after its first attempt.
    pub max_retries: u32,
    /// The delay before the first retry.
    pub base_delay: Duration,
    /// The upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// The delay to wait before retry number `retry` (zero based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);

        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether a read that has already been retried `retries` times should be
    /// tried again after failing with `error`.
    pub fn should_retry(&self, error: &Error, retries: u32) -> bool {
        retries < self.max_retries && error.is_transient()
    }
}
