//! Resolution state machine for one logical create call.
//!
//! ```text
//! SUBMITTING --direct result---> DONE
//! SUBMITTING --operation-------> POLLING             (detached: DONE)
//! SUBMITTING --transient-------> SUBMITTING | FAILED (same operation_id)
//! SUBMITTING --already exists--> POLLING             (detached: FETCHING)
//! SUBMITTING --fatal-----------> FAILED
//! POLLING    --SUCCESS---------> RECONCILING --> DONE
//! POLLING    --FAIL / deadline-> FAILED
//! FETCHING   --fetched---------> DONE
//! ```
//!
//! [`transition`] is a pure function; the caller performs the returned [`Action`]
//! and feeds the outcome back as the next [`Event`].

use crate::client::policy::RetryPolicy;
use crate::Error;
use std::time::Duration;

/// Whether the caller waits for the created objects or only for the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resolve operations to the persisted objects.
    Wait,
    /// Return the operation as soon as the server has accepted it.
    Detach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// `attempt` is 0-based: the first submission is attempt 0.
    Submitting { attempt: u32 },
    Polling,
    Fetching,
    Reconciling,
    Done,
    Failed,
}

impl State {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done | State::Failed)
    }
}

/// How a submission failed, as far as the retry logic is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitFailure {
    /// Connection error, 5xx or 429: the same request may be re-sent.
    Transient,
    /// `OPERATION_ALREADY_EXISTS`: an earlier attempt was accepted.
    AlreadyExists,
    Fatal,
}

impl SubmitFailure {
    pub fn classify(err: &Error) -> Self {
        if err.is_operation_already_exists() {
            SubmitFailure::AlreadyExists
        } else if err.is_retryable() {
            SubmitFailure::Transient
        } else {
            SubmitFailure::Fatal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Server answered with the created object(s).
    SubmittedDirect,
    /// Server answered with an operation.
    SubmittedOperation,
    SubmitFailed(SubmitFailure),
    OperationSucceeded,
    OperationFailed,
    DeadlineExceeded,
    Fetched,
    Reconciled,
    /// A poll, fetch or reconcile request failed outright.
    StepFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send the creation request, after waiting `after`.
    Submit { after: Duration },
    /// Poll the operation until it is terminal.
    Poll,
    /// Fetch the operation once.
    FetchOperation,
    /// Read the log and fetch the created objects.
    Reconcile,
    /// Return the result gathered so far.
    Finish,
    /// Surface the last error.
    Raise,
}

/// Initial state and action of a logical call.
pub fn start() -> (State, Action) {
    (
        State::Submitting { attempt: 0 },
        Action::Submit {
            after: Duration::ZERO,
        },
    )
}

/// Advance the machine. Events that make no sense in `state` fail the call.
pub fn transition(state: State, event: Event, mode: Mode, policy: &RetryPolicy) -> (State, Action) {
    match (state, event) {
        (State::Submitting { .. }, Event::SubmittedDirect) => (State::Done, Action::Finish),

        (State::Submitting { .. }, Event::SubmittedOperation) => match mode {
            Mode::Wait => (State::Polling, Action::Poll),
            Mode::Detach => (State::Done, Action::Finish),
        },

        (State::Submitting { attempt }, Event::SubmitFailed(SubmitFailure::Transient)) => {
            if attempt < policy.max_retries {
                (
                    State::Submitting {
                        attempt: attempt + 1,
                    },
                    Action::Submit {
                        after: policy.backoff_delay(attempt),
                    },
                )
            } else {
                (State::Failed, Action::Raise)
            }
        }

        (State::Submitting { .. }, Event::SubmitFailed(SubmitFailure::AlreadyExists)) => {
            match mode {
                Mode::Wait => (State::Polling, Action::Poll),
                Mode::Detach => (State::Fetching, Action::FetchOperation),
            }
        }

        (State::Submitting { .. }, Event::SubmitFailed(SubmitFailure::Fatal)) => {
            (State::Failed, Action::Raise)
        }

        (State::Polling, Event::OperationSucceeded) => (State::Reconciling, Action::Reconcile),
        (State::Polling, Event::OperationFailed | Event::DeadlineExceeded | Event::StepFailed) => {
            (State::Failed, Action::Raise)
        }

        (State::Fetching, Event::Fetched) => (State::Done, Action::Finish),
        (State::Fetching, Event::StepFailed) => (State::Failed, Action::Raise),

        (State::Reconciling, Event::Reconciled) => (State::Done, Action::Finish),
        (State::Reconciling, Event::StepFailed) => (State::Failed, Action::Raise),

        _ => (State::Failed, Action::Raise),
    }
}
