//! Reconnection backoff policy.

use std::time::Duration;

/// Delay schedule and attempt budget for automatic reconnects.
///
/// The delay grows linearly with the attempt count up to `cap`. After
/// `max_attempts` consecutive failures the transport stays down until an
/// explicit reconnect; a successful connect resets the counter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = self
            .base
            .checked_mul(attempt.saturating_add(1))
            .unwrap_or(self.cap);
        scaled.min(self.cap)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
