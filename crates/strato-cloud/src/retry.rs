//! Retry configuration for provider operations

use std::time::Duration;

/// Retry configuration shared by polling loops and optimistic writes.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (polls, or full read-modify-write cycles).
    pub max_attempts: u32,

    /// Initial delay between attempts.
    pub initial_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,

    /// Backoff multiplier.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before the given retry, with exponential backoff capped at
    /// `max_delay`. `attempt` is zero-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}
