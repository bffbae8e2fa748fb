//! Operation poller.

use crate::client::context::CallContext;
use crate::types::operation::{Operation, OperationStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Anything that can fetch the current state of an operation.
#[async_trait]
pub trait OperationSource: Send + Sync {
    async fn fetch_operation(&self, operation_id: &str, ctx: &CallContext) -> Result<Operation>;
}

/// Polling cadence and deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay after the first non-terminal fetch.
    pub initial_interval: Duration,
    /// Upper bound for the delay between fetches.
    pub max_interval: Duration,
    /// Multiplier applied to the delay after every non-terminal fetch.
    pub backoff_factor: u32,
    /// Give up after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            backoff_factor: 2,
            timeout: None,
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `BONUS_POLL_INTERVAL_MS`, `BONUS_POLL_MAX_INTERVAL_MS`
    /// and `BONUS_POLL_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_u64 = |name: &str| std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok());

        let initial_interval = env_u64("BONUS_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_interval);
        let max_interval = env_u64("BONUS_POLL_MAX_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_interval)
            .max(initial_interval);
        let timeout = env_u64("BONUS_POLL_TIMEOUT_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs);

        Self {
            initial_interval,
            max_interval,
            backoff_factor: defaults.backoff_factor,
            timeout,
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_factor(mut self, factor: u32) -> Self {
        self.backoff_factor = factor.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.backoff_factor)
            .min(self.max_interval)
    }
}

/// Waits for operations to reach `SUCCESS` or `FAIL`.
#[derive(Debug, Clone, Default)]
pub struct OperationPoller {
    config: PollConfig,
}

impl OperationPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Fetch the operation until it is terminal.
    ///
    /// The first fetch is immediate. `SUCCESS` returns the operation, `FAIL` becomes
    /// [`Error::FailedOperation`], and running past the deadline becomes
    /// [`Error::OperationTimeout`]. Fetch errors are returned as they are.
    pub async fn wait<S>(&self, source: &S, operation_id: &str, ctx: &CallContext) -> Result<Operation>
    where
        S: OperationSource + ?Sized,
    {
        let started = Instant::now();
        let mut interval = self.config.initial_interval;
        let mut polls: u32 = 0;

        loop {
            let operation = source.fetch_operation(operation_id, ctx).await?;
            polls += 1;

            match operation.status {
                OperationStatus::Success => {
                    debug!(
                        operation_id,
                        polls,
                        duration_ms = started.elapsed().as_millis(),
                        "operation succeeded"
                    );
                    return Ok(operation);
                }
                OperationStatus::Fail => {
                    debug!(operation_id, polls, "operation failed");
                    return Err(Error::FailedOperation(Box::new(operation)));
                }
                OperationStatus::Pending | OperationStatus::Running => {}
            }

            if let Some(timeout) = self.config.timeout {
                let elapsed = started.elapsed();
                if elapsed + interval > timeout {
                    return Err(Error::OperationTimeout {
                        operation_id: operation_id.to_string(),
                        elapsed_ms: elapsed.as_millis(),
                        last_status: operation.status,
                    });
                }
            }

            debug!(
                operation_id,
                status = operation.status.as_str(),
                next_poll_ms = interval.as_millis(),
                "operation not finished yet"
            );
            tokio::time::sleep(interval).await;
            interval = self.config.next_interval(interval);
        }
    }
}
