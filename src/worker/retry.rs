use std::time::Duration;

/// Longest single wait between attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times a worker tries one chunk and how long it waits in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included; at least 1
    pub max_attempts: u32,
    /// Base delay; zero retries immediately
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Wait after the `failed_attempts`-th failure: `backoff * 2^(n-1)`, capped
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        if self.backoff.is_zero() || failed_attempts == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(failed_attempts - 1);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}
