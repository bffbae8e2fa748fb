use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MIN_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Retry policy for transient submission failures.
///
/// Every retry re-sends the same request with the same `operation_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `BONUS_MAX_RETRIES`, `BONUS_RETRY_MIN_DELAY_MS`
    /// and `BONUS_RETRY_MAX_DELAY_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_u64 = |name: &str| std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok());

        let max_retries = std::env::var("BONUS_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);
        let min_delay = env_u64("BONUS_RETRY_MIN_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.min_delay);
        let max_delay = env_u64("BONUS_RETRY_MAX_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay)
            .max(min_delay);

        Self {
            max_retries,
            min_delay,
            max_delay,
        }
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Never retry.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Delay before retry number `attempt + 1`; `attempt` is 0-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // exponential backoff: min_delay * 2^attempt
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }
}
