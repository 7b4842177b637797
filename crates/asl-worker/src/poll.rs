//! Backoff for the polling loop.
//!
//! Queue failures (a dropped connection, a failed acknowledge) do not end
//! the worker. The loop waits `initial * 2^n` after the n-th consecutive
//! failure, capped at `max`, and resets after the next successful batch.

use std::time::Duration;

/// Exponential backoff over consecutive failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn failure(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.failures);
        self.failures = self.failures.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Forget earlier failures.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
