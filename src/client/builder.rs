use crate::client::context::CallContext;
use crate::client::core::BonusClient;
use crate::client::policy::RetryPolicy;
use crate::operations::poller::{OperationPoller, PollConfig};
use crate::operations::reconcile::Reconciler;
use crate::transport::http::HttpTransport;
use crate::transport::Transport;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://toloka.dev/api/v1";

/// Builder for [`BonusClient`].
///
/// Anything left unset falls back to the environment:
/// - `BONUS_API_URL` (default `https://toloka.dev/api/v1`)
/// - `BONUS_API_TOKEN`
/// - `BONUS_HTTP_TIMEOUT_SECS` (default 30)
/// - `BONUS_MAX_RETRIES`, `BONUS_RETRY_MIN_DELAY_MS`, `BONUS_RETRY_MAX_DELAY_MS`
/// - `BONUS_POLL_INTERVAL_MS`, `BONUS_POLL_MAX_INTERVAL_MS`, `BONUS_POLL_TIMEOUT_SECS`
pub struct BonusClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    poll: Option<PollConfig>,
    caller: Option<String>,
    page_size: Option<u32>,
    transport: Option<Arc<dyn Transport>>,
}

impl BonusClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: None,
            retry: None,
            poll: None,
            caller: None,
            page_size: None,
            transport: None,
        }
    }

    /// API root, e.g. `https://sandbox.toloka.dev/api/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// OAuth token sent as `Authorization: OAuth <token>`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll = Some(config);
        self
    }

    /// Value of the `X-Caller-Context` header. Default `client`.
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Page size used when listing created bonuses back. Default 300.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Replace the HTTP transport. Base URL, token and timeout are then ignored.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<BonusClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let base_url = self
                    .base_url
                    .or_else(|| std::env::var("BONUS_API_URL").ok())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                validate_base_url(&base_url)?;

                let token = self
                    .token
                    .or_else(|| std::env::var("BONUS_API_TOKEN").ok())
                    .filter(|t| !t.is_empty());

                debug!(base_url = base_url.as_str(), authenticated = token.is_some(), "building bonus client");
                Arc::new(HttpTransport::new(&base_url, token, self.timeout)?)
            }
        };

        let reconciler = self
            .page_size
            .map(Reconciler::new)
            .unwrap_or_default();

        Ok(BonusClient {
            transport,
            retry: self.retry.unwrap_or_else(RetryPolicy::from_env),
            poller: OperationPoller::new(self.poll.unwrap_or_else(PollConfig::from_env)),
            reconciler,
            caller: self
                .caller
                .unwrap_or_else(|| CallContext::DEFAULT_CALLER.to_string()),
        })
    }
}

impl Default for BonusClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let parsed = url::Url::parse(base_url).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid base URL {:?}: {}", base_url, e),
            ErrorContext::new()
                .with_field_path("base_url")
                .with_source("builder"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("unsupported URL scheme {:?}", parsed.scheme()),
            ErrorContext::new()
                .with_field_path("base_url")
                .with_source("builder"),
        ));
    }
    Ok(())
}
