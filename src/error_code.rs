//! Platform API error codes and their retry semantics.
//!
//! Every non-2xx response from the platform carries a JSON body of the form
//! `{"code": "...", "message": "...", "request_id": "...", "payload": {...}}`.
//! The `code` string is mapped to [`ApiErrorCode`]; when the body is missing or
//! unparseable the HTTP status decides.
//!
//! ## Error Code Categories
//!
//! | Category    | Codes                                                   |
//! |-------------|---------------------------------------------------------|
//! | client      | `VALIDATION_ERROR`, `DOES_NOT_EXIST`, `ACCESS_DENIED`, ... |
//! | operational | `OPERATION_ALREADY_EXISTS`, `CONFLICT_STATE`            |
//! | rate        | `TOO_MANY_REQUESTS`                                     |
//! | server      | `INTERNAL_ERROR`, `REMOTE_SERVICE_UNAVAILABLE`          |
//!
//! ## Example
//!
//! ```rust
//! use user_bonus_client::error_code::ApiErrorCode;
//!
//! let code = ApiErrorCode::from_code("OPERATION_ALREADY_EXISTS").unwrap();
//! assert!(!code.retryable());
//! assert_eq!(code.category(), "operational");
//! assert_eq!(ApiErrorCode::from_http_status(503), ApiErrorCode::RemoteServiceUnavailable);
//! ```

use std::fmt;

/// Error code reported by the platform API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// Request body or parameters failed validation
    ValidationError,
    /// Missing or invalid OAuth token
    AuthenticationError,
    /// Token is valid but the requester may not touch the resource
    AccessDenied,
    /// Referenced object does not exist
    DoesNotExist,
    /// An operation with the supplied `operation_id` was already accepted
    OperationAlreadyExists,
    /// Object is in a state that forbids the action
    ConflictState,
    /// Requester's balance does not cover the payment
    InsufficientFunds,
    /// Request rate limit exceeded
    TooManyRequests,
    /// Unexpected server-side failure
    InternalError,
    /// Server or one of its dependencies is temporarily unavailable
    RemoteServiceUnavailable,
    /// Code could not be classified
    Unknown,
}

impl ApiErrorCode {
    /// Returns the wire code string (e.g. `"OPERATION_ALREADY_EXISTS"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::DoesNotExist => "DOES_NOT_EXIST",
            Self::OperationAlreadyExists => "OPERATION_ALREADY_EXISTS",
            Self::ConflictState => "CONFLICT_STATE",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::InternalError => "INTERNAL_ERROR",
            Self::RemoteServiceUnavailable => "REMOTE_SERVICE_UNAVAILABLE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Returns whether a request failing with this code may be re-sent as is.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManyRequests | Self::InternalError | Self::RemoteServiceUnavailable
        )
    }

    /// Returns the category: `"client"`, `"operational"`, `"rate"`, `"server"` or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::ValidationError
            | Self::AuthenticationError
            | Self::AccessDenied
            | Self::DoesNotExist
            | Self::InsufficientFunds => "client",
            Self::OperationAlreadyExists | Self::ConflictState => "operational",
            Self::TooManyRequests => "rate",
            Self::InternalError | Self::RemoteServiceUnavailable => "server",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a wire code string to the corresponding `ApiErrorCode`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = match code {
            "VALIDATION_ERROR" => Self::ValidationError,
            "AUTHENTICATION_ERROR" => Self::AuthenticationError,
            "ACCESS_DENIED" => Self::AccessDenied,
            "DOES_NOT_EXIST" => Self::DoesNotExist,
            "OPERATION_ALREADY_EXISTS" => Self::OperationAlreadyExists,
            "CONFLICT_STATE" => Self::ConflictState,
            "INSUFFICIENT_FUNDS" => Self::InsufficientFunds,
            "TOO_MANY_REQUESTS" => Self::TooManyRequests,
            "INTERNAL_ERROR" => Self::InternalError,
            "REMOTE_SERVICE_UNAVAILABLE" => Self::RemoteServiceUnavailable,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status code to the most likely `ApiErrorCode`.
    ///
    /// 409 is deliberately left as `ConflictState`: only an explicit
    /// `OPERATION_ALREADY_EXISTS` body means the submission was accepted earlier.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::ValidationError,
            401 => Self::AuthenticationError,
            402 => Self::InsufficientFunds,
            403 => Self::AccessDenied,
            404 => Self::DoesNotExist,
            409 => Self::ConflictState,
            429 => Self::TooManyRequests,
            500 => Self::InternalError,
            502..=504 => Self::RemoteServiceUnavailable,
            s if s >= 500 => Self::InternalError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
