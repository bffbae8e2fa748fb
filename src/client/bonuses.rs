//! Public bonus creation calls.
//!
//! Each call generates one `operation_id` up front and drives
//! [`machine`](crate::operations::machine) until it reaches a terminal state.
//! Every resubmission reuses that id.

use crate::client::context::CallContext;
use crate::client::core::BonusClient;
use crate::client::submit::{self, Submitted};
use crate::operations::machine::{self, Action, Event, Mode, State, SubmitFailure};
use crate::operations::poller::OperationSource;
use crate::transport::ApiRequest;
use crate::types::batch::UserBonusBatchCreateResult;
use crate::types::bonus::{
    UserBonus, UserBonusCreateRequestParameters, UserBonusesCreateRequestParameters,
};
use crate::types::operation::Operation;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One kind of creation call: how to build its request and how to turn each
/// kind of answer into its output.
#[async_trait]
trait CreateFlow: Send + Sync {
    type Output: Send;

    fn request(&self, operation_id: &Uuid) -> Result<ApiRequest>;

    /// Output from an answer that needed no reconciliation.
    fn finish(&self, submitted: Submitted, ctx: &ErrorContext) -> Result<Self::Output>;

    async fn reconcile(
        &self,
        client: &BonusClient,
        operation: &Operation,
        ctx: &CallContext,
    ) -> Result<Self::Output>;
}

struct SingleCreate<'a> {
    bonus: &'a UserBonus,
    async_mode: bool,
}

#[async_trait]
impl<'a> CreateFlow for SingleCreate<'a> {
    type Output = UserBonus;

    fn request(&self, operation_id: &Uuid) -> Result<ApiRequest> {
        submit::single_request(self.bonus, operation_id, self.async_mode, self.async_mode)
    }

    fn finish(&self, submitted: Submitted, ctx: &ErrorContext) -> Result<UserBonus> {
        match submitted {
            Submitted::Bonus(bonus) => Ok(bonus),
            Submitted::Batch(mut result) => {
                if let Some(bonus) = result.items.remove("0") {
                    return Ok(bonus);
                }
                let details = result.validation_errors.remove("0");
                Err(Error::Validation {
                    message: "user bonus was rejected".to_string(),
                    details,
                    context: ctx.clone(),
                })
            }
            other => Err(unexpected(other.kind(), "a user bonus", ctx)),
        }
    }

    async fn reconcile(
        &self,
        client: &BonusClient,
        operation: &Operation,
        ctx: &CallContext,
    ) -> Result<UserBonus> {
        let submitted = submit::bonus_body(self.bonus, self.async_mode.then_some(0))?;
        client.reconciler.single(client, operation, &submitted, ctx).await
    }
}

struct BatchCreate<'a> {
    bonuses: &'a [UserBonus],
    async_mode: bool,
    skip_invalid_items: Option<bool>,
}

#[async_trait]
impl<'a> CreateFlow for BatchCreate<'a> {
    type Output = UserBonusBatchCreateResult;

    fn request(&self, operation_id: &Uuid) -> Result<ApiRequest> {
        submit::batch_request(
            self.bonuses,
            operation_id,
            self.async_mode,
            self.skip_invalid_items,
            self.async_mode,
        )
    }

    fn finish(&self, submitted: Submitted, ctx: &ErrorContext) -> Result<UserBonusBatchCreateResult> {
        match submitted {
            Submitted::Batch(result) => {
                let submitted = self.bonuses.len();
                if !result.covers(submitted) {
                    return Err(Error::reconciliation_with_context(
                        "batch result does not cover every submitted item",
                        ctx.clone().with_details(format!(
                            "submitted {}, created {:?}, rejected {:?}",
                            submitted,
                            result.items.keys().collect::<Vec<_>>(),
                            result.validation_errors.keys().collect::<Vec<_>>(),
                        )),
                    ));
                }
                Ok(result)
            }
            Submitted::Bonus(bonus) if self.bonuses.len() == 1 => {
                let mut result = UserBonusBatchCreateResult::default();
                result.items.insert("0".to_string(), bonus);
                Ok(result)
            }
            other => Err(unexpected(other.kind(), "a batch result", ctx)),
        }
    }

    async fn reconcile(
        &self,
        client: &BonusClient,
        operation: &Operation,
        ctx: &CallContext,
    ) -> Result<UserBonusBatchCreateResult> {
        let submitted = submit::bonus_bodies(self.bonuses, self.async_mode)?;
        client
            .reconciler
            .batch(client, operation, &submitted, ctx)
            .await
    }
}

/// Batch creation that stops at the accepted operation.
struct DetachedBatchCreate<'a> {
    bonuses: &'a [UserBonus],
    skip_invalid_items: Option<bool>,
}

#[async_trait]
impl<'a> CreateFlow for DetachedBatchCreate<'a> {
    type Output = Operation;

    fn request(&self, operation_id: &Uuid) -> Result<ApiRequest> {
        submit::batch_request(self.bonuses, operation_id, true, self.skip_invalid_items, false)
    }

    fn finish(&self, submitted: Submitted, ctx: &ErrorContext) -> Result<Operation> {
        match submitted {
            Submitted::Operation(operation) => Ok(operation),
            other => Err(unexpected(other.kind(), "an operation", ctx)),
        }
    }

    async fn reconcile(
        &self,
        _client: &BonusClient,
        operation: &Operation,
        _ctx: &CallContext,
    ) -> Result<Operation> {
        Ok(operation.clone())
    }
}

fn unexpected(got: &str, wanted: &str, ctx: &ErrorContext) -> Error {
    Error::unexpected_response(
        format!("expected {} in response, got {}", wanted, got),
        ctx.clone(),
    )
}

fn reject_empty(count: usize, method: &str) -> Result<()> {
    if count == 0 {
        return Err(Error::validation_with_context(
            "at least one user bonus is required",
            ErrorContext::new()
                .with_field_path("user_bonuses")
                .with_source(method),
        ));
    }
    Ok(())
}

impl BonusClient {
    /// Create one bonus and return it as persisted.
    ///
    /// Operations returned by the server are polled and reconciled transparently.
    /// A rejected bonus surfaces as [`Error::Validation`]; a failed operation as
    /// [`Error::FailedOperation`].
    pub async fn create_user_bonus(
        &self,
        bonus: &UserBonus,
        params: UserBonusCreateRequestParameters,
    ) -> Result<UserBonus> {
        self.create_user_bonus_with_context(bonus, params, &self.context("create_user_bonus"))
            .await
    }

    pub async fn create_user_bonus_with_context(
        &self,
        bonus: &UserBonus,
        params: UserBonusCreateRequestParameters,
        ctx: &CallContext,
    ) -> Result<UserBonus> {
        let flow = SingleCreate {
            bonus,
            async_mode: params.async_mode,
        };
        let operation_id = params.operation_id.unwrap_or_else(Uuid::new_v4);
        self.resolve(&flow, operation_id, Mode::Wait, ctx).await
    }

    /// Create several bonuses and return the outcome of each, keyed by its
    /// position in `bonuses`.
    ///
    /// Items rejected by validation are reported in
    /// [`UserBonusBatchCreateResult::validation_errors`], not as an error.
    pub async fn create_user_bonuses(
        &self,
        bonuses: &[UserBonus],
        params: UserBonusesCreateRequestParameters,
    ) -> Result<UserBonusBatchCreateResult> {
        self.create_user_bonuses_with_context(bonuses, params, &self.context("create_user_bonuses"))
            .await
    }

    pub async fn create_user_bonuses_with_context(
        &self,
        bonuses: &[UserBonus],
        params: UserBonusesCreateRequestParameters,
        ctx: &CallContext,
    ) -> Result<UserBonusBatchCreateResult> {
        reject_empty(bonuses.len(), "create_user_bonuses")?;
        let flow = BatchCreate {
            bonuses,
            async_mode: params.async_mode,
            skip_invalid_items: params.skip_invalid_items,
        };
        let operation_id = params.operation_id.unwrap_or_else(Uuid::new_v4);
        self.resolve(&flow, operation_id, Mode::Wait, ctx).await
    }

    /// Submit bonuses as an operation and return it without waiting.
    ///
    /// `params.async_mode` is ignored: the request always asks for an operation.
    /// Follow up with [`BonusClient::wait_operation`] and
    /// [`BonusClient::get_operation_log`].
    pub async fn create_user_bonuses_async(
        &self,
        bonuses: &[UserBonus],
        params: UserBonusesCreateRequestParameters,
    ) -> Result<Operation> {
        self.create_user_bonuses_async_with_context(
            bonuses,
            params,
            &self.context("create_user_bonuses_async"),
        )
        .await
    }

    pub async fn create_user_bonuses_async_with_context(
        &self,
        bonuses: &[UserBonus],
        params: UserBonusesCreateRequestParameters,
        ctx: &CallContext,
    ) -> Result<Operation> {
        reject_empty(bonuses.len(), "create_user_bonuses_async")?;
        let flow = DetachedBatchCreate {
            bonuses,
            skip_invalid_items: params.skip_invalid_items,
        };
        let operation_id = params.operation_id.unwrap_or_else(Uuid::new_v4);
        self.resolve(&flow, operation_id, Mode::Detach, ctx).await
    }

    async fn resolve<F: CreateFlow>(
        &self,
        flow: &F,
        operation_id: Uuid,
        mode: Mode,
        ctx: &CallContext,
    ) -> Result<F::Output> {
        let op_id = operation_id.to_string();
        let err_ctx = ErrorContext::new()
            .with_operation_id(op_id.as_str())
            .with_source(ctx.top_level_method.as_str());

        let (mut state, mut action) = machine::start();
        let mut direct: Option<Submitted> = None;
        let mut operation: Option<Operation> = None;
        let mut output: Option<F::Output> = None;
        let mut last_error: Option<Error> = None;

        loop {
            let event = match action {
                Action::Submit { after } => {
                    if !after.is_zero() {
                        tokio::time::sleep(after).await;
                    }
                    let attempt = match state {
                        State::Submitting { attempt } => attempt,
                        _ => 0,
                    };
                    match self.submit(flow, &operation_id, ctx).await {
                        Ok(Submitted::Operation(op)) => {
                            debug!(operation_id = op_id.as_str(), status = op.status.as_str(), "server accepted an operation");
                            if op.id != op_id {
                                warn!(
                                    operation_id = op_id.as_str(),
                                    server_operation_id = op.id.as_str(),
                                    "server answered with a different operation id, following it"
                                );
                            }
                            operation = Some(op);
                            Event::SubmittedOperation
                        }
                        Ok(answer) => {
                            direct = Some(answer);
                            Event::SubmittedDirect
                        }
                        Err(e) => {
                            let failure = SubmitFailure::classify(&e);
                            match failure {
                                SubmitFailure::Transient => warn!(
                                    operation_id = op_id.as_str(),
                                    attempt,
                                    error = %e,
                                    "submission failed, retrying with the same operation_id"
                                ),
                                SubmitFailure::AlreadyExists => info!(
                                    operation_id = op_id.as_str(),
                                    attempt,
                                    "operation already exists, resuming it"
                                ),
                                SubmitFailure::Fatal => {}
                            }
                            last_error = Some(e);
                            Event::SubmitFailed(failure)
                        }
                    }
                }

                Action::Poll => {
                    let poll_id = operation.as_ref().map_or_else(|| op_id.clone(), |op| op.id.clone());
                    match self.poller.wait(self, &poll_id, ctx).await {
                        Ok(op) => {
                            operation = Some(op);
                            Event::OperationSucceeded
                        }
                        Err(e) => {
                            let event = match &e {
                                Error::FailedOperation(_) => Event::OperationFailed,
                                Error::OperationTimeout { .. } => Event::DeadlineExceeded,
                                _ => Event::StepFailed,
                            };
                            last_error = Some(e);
                            event
                        }
                    }
                }

                Action::FetchOperation => match self.fetch_operation(&op_id, ctx).await {
                    Ok(op) => {
                        operation = Some(op);
                        Event::Fetched
                    }
                    Err(e) => {
                        last_error = Some(e);
                        Event::StepFailed
                    }
                },

                Action::Reconcile => {
                    let reconciled = match operation.as_ref() {
                        Some(op) => flow.reconcile(self, op, ctx).await,
                        None => Err(Error::reconciliation_with_context(
                            "no operation to reconcile",
                            err_ctx.clone(),
                        )),
                    };
                    match reconciled {
                        Ok(out) => {
                            output = Some(out);
                            Event::Reconciled
                        }
                        Err(e) => {
                            last_error = Some(e);
                            Event::StepFailed
                        }
                    }
                }

                Action::Finish => {
                    if let Some(out) = output {
                        return Ok(out);
                    }
                    if let Some(answer) = direct {
                        return flow.finish(answer, &err_ctx);
                    }
                    return match operation {
                        Some(op) => flow.finish(Submitted::Operation(op), &err_ctx),
                        None => Err(Error::unexpected_response(
                            "call finished without a result",
                            err_ctx,
                        )),
                    };
                }

                Action::Raise => {
                    return Err(last_error.unwrap_or_else(|| {
                        Error::unexpected_response("call failed without an error", err_ctx)
                    }));
                }
            };

            let (next_state, next_action) = machine::transition(state, event, mode, &self.retry);
            state = next_state;
            action = next_action;
        }
    }

    async fn submit<F: CreateFlow>(
        &self,
        flow: &F,
        operation_id: &Uuid,
        ctx: &CallContext,
    ) -> Result<Submitted> {
        let request = flow.request(operation_id)?.with_headers(ctx.headers());
        let response = self.send(request).await?;
        Submitted::decode(response.status, &response.body)
    }
}
