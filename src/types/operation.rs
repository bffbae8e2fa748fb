//! Server-side asynchronous operations and their logs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an operation. `SUCCESS` and `FAIL` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Success,
    Fail,
}

impl OperationStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item counters reported by batch operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_valid_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<u64>,
}

/// Server-tracked asynchronous task.
///
/// The id is the `operation_id` the client supplied when submitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<OperationDetails>,
}

impl Operation {
    pub fn with_status(id: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            id: id.into(),
            operation_type: None,
            status,
            submitted: None,
            started: None,
            finished: None,
            parameters: None,
            details: None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Outcome of one submitted item, as recorded in `GET /operations/{id}/log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    pub success: bool,
    #[serde(default)]
    pub input: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
}

impl OperationLogItem {
    /// Position of the item in the original submission, from its `__item_idx` tag.
    ///
    /// The tag travels as a string but numbers are accepted too.
    pub fn item_index(&self) -> Option<usize> {
        match self.input.get(super::ITEM_INDEX_KEY)? {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
            _ => None,
        }
    }

    /// Identifier of the created bonus for a successful entry.
    pub fn user_bonus_id(&self) -> Option<&str> {
        self.output.as_ref()?.get("user_bonus_id")?.as_str()
    }
}
