use std::time::Duration;

pub const DEFAULT_SUBSCRIBE_RETRY_MS: u64 = 2_000;
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Delay schedule for subscribe attempts.
///
/// `multiplier == 1` gives a fixed interval. `max_attempts == None` retries
/// until cancelled.
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    pub max_attempts: Option<usize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(DEFAULT_SUBSCRIBE_RETRY_MS))
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1,
            max_attempts: None,
        }
    }

    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: 2,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Whether attempt number `attempt` (1-based) may be started.
    pub fn allows_attempt(&self, attempt: usize) -> bool {
        match self.max_attempts {
            Some(max_attempts) => attempt <= max_attempts,
            None => true,
        }
    }

    /// Sleep before retrying after `failures` consecutive failed attempts.
    pub fn delay_after(&self, failures: usize) -> Duration {
        let shift = u32::try_from(failures.saturating_sub(1))
            .unwrap_or(MAX_BACKOFF_SHIFT)
            .min(MAX_BACKOFF_SHIFT);
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(shift);
        let initial_ms = duration_millis(self.initial_delay);
        let max_ms = duration_millis(self.max_delay);
        Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
    }
}
