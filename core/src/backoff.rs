use serde::Deserialize;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 1_000;

/// Bounded retry schedule for compare-and-set conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { attempts: 3, backoff_ms: 10 }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_ms: u64) -> Self {
        RetryPolicy { attempts, backoff_ms }
    }

    /// Never less than one attempt.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self.backoff_ms.saturating_mul(1u64 << shift).min(MAX_BACKOFF_MS);
        Duration::from_millis(ms)
    }
}
