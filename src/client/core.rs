use crate::client::context::CallContext;
use crate::client::policy::RetryPolicy;
use crate::error_code::ApiErrorCode;
use crate::operations::poller::{OperationPoller, OperationSource};
use crate::operations::reconcile::{BonusLookup, Reconciler};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::types::bonus::{UserBonus, UserBonusSearchRequest, UserBonusSearchResult};
use crate::types::operation::{Operation, OperationLogItem};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Client for the user-bonus API.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct BonusClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) retry: RetryPolicy,
    pub(crate) poller: OperationPoller,
    pub(crate) reconciler: Reconciler,
    pub(crate) caller: String,
}

/// Error body returned by the platform on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
    payload: Option<serde_json::Value>,
}

impl BonusClient {
    /// Client configured from the environment only.
    pub fn from_env() -> Result<Self> {
        crate::client::builder::BonusClientBuilder::new().build()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn poll_config(&self) -> &crate::operations::poller::PollConfig {
        self.poller.config()
    }

    /// Top-level context for a public call to `method`.
    pub(crate) fn context(&self, method: &str) -> CallContext {
        CallContext::new(method).with_caller(self.caller.as_str())
    }

    /// Send a request; non-2xx responses become [`Error::Remote`].
    pub(crate) async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.as_str();
        let path = request.path.clone();
        let start = Instant::now();

        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            let err = Self::remote_error(&response);
            info!(
                http_status = response.status,
                error_code = err_code(&err),
                method,
                endpoint = path.as_str(),
                duration_ms = start.elapsed().as_millis(),
                "user-bonus API request failed"
            );
            return Err(err);
        }

        debug!(
            http_status = response.status,
            method,
            endpoint = path.as_str(),
            duration_ms = start.elapsed().as_millis(),
            "user-bonus API request finished"
        );
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    fn remote_error(response: &ApiResponse) -> Error {
        let status = response.status;
        let body: Option<ApiErrorBody> = serde_json::from_str(&response.body).ok();

        let raw_code = body.as_ref().and_then(|b| b.code.clone());
        let code = raw_code
            .as_deref()
            .and_then(ApiErrorCode::from_code)
            .unwrap_or_else(|| ApiErrorCode::from_http_status(status));
        let retryable = code.retryable() || status >= 500 || status == 429;

        let mut context = ErrorContext::new()
            .with_status_code(status)
            .with_source("user_bonus_api");
        if let Some(raw) = raw_code {
            context = context.with_error_code(raw);
        }
        if let Some(id) = body.as_ref().and_then(|b| b.request_id.clone()) {
            context = context.with_request_id(id);
        }

        let (message, payload) = match body {
            Some(b) => (b.message.unwrap_or_default(), b.payload),
            None => (response.body.clone(), None),
        };

        Error::Remote {
            status,
            code,
            message,
            retryable,
            payload,
            context,
        }
    }

    /// `GET /operations/{id}`.
    pub async fn get_operation(&self, operation_id: &str) -> Result<Operation> {
        self.get_operation_with_context(operation_id, &self.context("get_operation"))
            .await
    }

    pub async fn get_operation_with_context(
        &self,
        operation_id: &str,
        ctx: &CallContext,
    ) -> Result<Operation> {
        self.fetch_operation(operation_id, ctx).await
    }

    /// `GET /operations/{id}/log`.
    pub async fn get_operation_log(&self, operation_id: &str) -> Result<Vec<OperationLogItem>> {
        self.get_operation_log_with_context(operation_id, &self.context("get_operation_log"))
            .await
    }

    pub async fn get_operation_log_with_context(
        &self,
        operation_id: &str,
        ctx: &CallContext,
    ) -> Result<Vec<OperationLogItem>> {
        self.fetch_operation_log(operation_id, ctx).await
    }

    /// Poll `operation` until it reaches `SUCCESS` or `FAIL`.
    ///
    /// `FAIL` is returned as [`Error::FailedOperation`]; a configured poll timeout
    /// as [`Error::OperationTimeout`].
    pub async fn wait_operation(&self, operation: &Operation) -> Result<Operation> {
        self.wait_operation_with_context(operation, &self.context("wait_operation"))
            .await
    }

    pub async fn wait_operation_with_context(
        &self,
        operation: &Operation,
        ctx: &CallContext,
    ) -> Result<Operation> {
        self.poller.wait(self, &operation.id, ctx).await
    }

    /// `GET /user-bonuses/{id}`.
    pub async fn get_user_bonus(&self, user_bonus_id: &str) -> Result<UserBonus> {
        self.get_user_bonus_with_context(user_bonus_id, &self.context("get_user_bonus"))
            .await
    }

    pub async fn get_user_bonus_with_context(
        &self,
        user_bonus_id: &str,
        ctx: &CallContext,
    ) -> Result<UserBonus> {
        self.fetch_user_bonus(user_bonus_id, ctx).await
    }

    /// `GET /user-bonuses` with filters; one page.
    pub async fn find_user_bonuses(
        &self,
        request: &UserBonusSearchRequest,
    ) -> Result<UserBonusSearchResult> {
        self.find_user_bonuses_with_context(request, &self.context("find_user_bonuses"))
            .await
    }

    pub async fn find_user_bonuses_with_context(
        &self,
        request: &UserBonusSearchRequest,
        ctx: &CallContext,
    ) -> Result<UserBonusSearchResult> {
        self.search_user_bonuses(request, ctx).await
    }
}

fn err_code(err: &Error) -> &'static str {
    match err {
        Error::Remote { code, .. } => code.code(),
        _ => "",
    }
}

#[async_trait]
impl OperationSource for BonusClient {
    async fn fetch_operation(&self, operation_id: &str, ctx: &CallContext) -> Result<Operation> {
        let request = ApiRequest::get(format!("/operations/{}", operation_id))
            .with_headers(ctx.low_level("get_operation").headers());
        self.get_json(request).await
    }
}

#[async_trait]
impl BonusLookup for BonusClient {
    async fn fetch_operation_log(
        &self,
        operation_id: &str,
        ctx: &CallContext,
    ) -> Result<Vec<OperationLogItem>> {
        let request = ApiRequest::get(format!("/operations/{}/log", operation_id))
            .with_headers(ctx.low_level("get_operation_log").headers());
        self.get_json(request).await
    }

    async fn fetch_user_bonus(&self, id: &str, ctx: &CallContext) -> Result<UserBonus> {
        let request = ApiRequest::get(format!("/user-bonuses/{}", id))
            .with_headers(ctx.low_level("get_user_bonus").headers());
        self.get_json(request).await
    }

    async fn search_user_bonuses(
        &self,
        request: &UserBonusSearchRequest,
        ctx: &CallContext,
    ) -> Result<UserBonusSearchResult> {
        let request = ApiRequest::get(crate::client::submit::USER_BONUSES_PATH)
            .with_query(request.to_query())
            .with_headers(ctx.low_level("find_user_bonuses").headers());
        self.get_json(request).await
    }
}
