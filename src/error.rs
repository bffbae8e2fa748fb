use crate::error_code::ApiErrorCode;
use crate::types::operation::{Operation, OperationStatus};
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "user_bonuses[1].amount")
    pub field_path: Option<String>,
    /// Additional context about the error
    pub details: Option<String>,
    /// Component that raised the error (e.g., "submitter", "reconciler")
    pub source: Option<String>,
    /// HTTP status of the response, when one was received
    pub status_code: Option<u16>,
    /// Raw error code string from the response body
    pub error_code: Option<String>,
    /// Server-side request id from the response body
    pub request_id: Option<String>,
    /// Idempotency token of the logical call
    pub operation_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }
}

/// Unified error type of the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Remote error: HTTP {status} ({code}): {message}")]
    Remote {
        status: u16,
        code: ApiErrorCode,
        message: String,
        retryable: bool,
        payload: Option<serde_json::Value>,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation {} failed{}", .0.id, format_counts(.0))]
    FailedOperation(Box<Operation>),

    #[error("Operation {operation_id} still {last_status} after {elapsed_ms} ms")]
    OperationTimeout {
        operation_id: String,
        elapsed_ms: u128,
        last_status: OperationStatus,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
        context: ErrorContext,
    },

    #[error("Reconciliation error: {message}{}", format_context(.context))]
    Reconciliation {
        message: String,
        context: ErrorContext,
    },

    #[error("Unexpected response: {message}{}", format_context(.context))]
    UnexpectedResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(ref op) = ctx.operation_id {
        parts.push(format!("operation_id: {}", op));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_counts(op: &Operation) -> String {
    match &op.details {
        Some(d) => format!(
            " (total: {}, valid: {}, not valid: {}, succeeded: {}, failed: {})",
            d.total_count.unwrap_or(0),
            d.valid_count.unwrap_or(0),
            d.not_valid_count.unwrap_or(0),
            d.success_count.unwrap_or(0),
            d.failed_count.unwrap_or(0),
        ),
        None => String::new(),
    }
}

impl Error {
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            details: None,
            context,
        }
    }

    pub fn reconciliation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Reconciliation {
            message: msg.into(),
            context,
        }
    }

    pub fn unexpected_response(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::UnexpectedResponse {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Whether re-sending the same request may succeed.
    ///
    /// Connection failures and 5xx/429 responses are transient. Everything else,
    /// including `OPERATION_ALREADY_EXISTS`, is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote { retryable, .. } => *retryable,
            Error::Transport(_) => true,
            _ => false,
        }
    }

    /// Whether the server reported that an operation with this id was already accepted.
    pub fn is_operation_already_exists(&self) -> bool {
        matches!(
            self,
            Error::Remote {
                code: ApiErrorCode::OperationAlreadyExists,
                ..
            }
        )
    }

    /// The terminal operation attached to a `FailedOperation` error.
    pub fn failed_operation(&self) -> Option<&Operation> {
        match self {
            Error::FailedOperation(op) => Some(&**op),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Remote { context, .. }
            | Error::Validation { context, .. }
            | Error::Reconciliation { context, .. }
            | Error::UnexpectedResponse { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
