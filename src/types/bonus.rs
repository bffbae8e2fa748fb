//! User bonuses and the parameters of their creation and lookup.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A bonus payment to a performer.
///
/// The same type is sent when creating a bonus and returned once it is persisted;
/// `id` and `created` are read-only and only set by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBonus {
    pub user_id: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_title: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_message: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub without_message: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
}

impl UserBonus {
    pub fn new(user_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            private_comment: None,
            public_title: None,
            public_message: None,
            without_message: None,
            assignment_id: None,
            id: None,
            created: None,
        }
    }

    pub fn with_private_comment(mut self, comment: impl Into<String>) -> Self {
        self.private_comment = Some(comment.into());
        self
    }

    pub fn with_assignment_id(mut self, assignment_id: impl Into<String>) -> Self {
        self.assignment_id = Some(assignment_id.into());
        self
    }

    /// Add a localized title, e.g. `("EN", "Good Job!")`.
    pub fn with_public_title(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.public_title
            .get_or_insert_with(BTreeMap::new)
            .insert(lang.into(), text.into());
        self
    }

    /// Add a localized message, e.g. `("EN", "Ten tasks completed")`.
    pub fn with_public_message(mut self, lang: impl Into<String>, text: impl Into<String>) -> Self {
        self.public_message
            .get_or_insert_with(BTreeMap::new)
            .insert(lang.into(), text.into());
        self
    }

    /// Pay the bonus without notifying the performer.
    pub fn without_message(mut self) -> Self {
        self.without_message = Some(true);
        self
    }
}

/// Parameters for creating a single bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBonusCreateRequestParameters {
    /// Idempotency token; generated once per call when absent.
    pub operation_id: Option<Uuid>,
    /// Ask the server to run the creation as an operation.
    pub async_mode: bool,
}

impl Default for UserBonusCreateRequestParameters {
    fn default() -> Self {
        Self {
            operation_id: None,
            async_mode: true,
        }
    }
}

impl UserBonusCreateRequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation_id(mut self, id: Uuid) -> Self {
        self.operation_id = Some(id);
        self
    }

    pub fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }
}

/// Parameters for creating several bonuses at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBonusesCreateRequestParameters {
    pub operation_id: Option<Uuid>,
    pub async_mode: bool,
    /// Create the valid items even when others fail validation.
    pub skip_invalid_items: Option<bool>,
}

impl Default for UserBonusesCreateRequestParameters {
    fn default() -> Self {
        Self {
            operation_id: None,
            async_mode: true,
            skip_invalid_items: None,
        }
    }
}

impl UserBonusesCreateRequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation_id(mut self, id: Uuid) -> Self {
        self.operation_id = Some(id);
        self
    }

    pub fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    pub fn with_skip_invalid_items(mut self, skip: bool) -> Self {
        self.skip_invalid_items = Some(skip);
        self
    }
}

/// Filters for `GET /user-bonuses`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserBonusSearchRequest {
    pub user_id: Option<String>,
    pub assignment_id: Option<String>,
    pub private_comment: Option<String>,
    pub id_gt: Option<String>,
    pub id_gte: Option<String>,
    pub id_lt: Option<String>,
    pub id_lte: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
}

impl UserBonusSearchRequest {
    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let fields = [
            ("user_id", &self.user_id),
            ("assignment_id", &self.assignment_id),
            ("private_comment", &self.private_comment),
            ("id_gt", &self.id_gt),
            ("id_gte", &self.id_gte),
            ("id_lt", &self.id_lt),
            ("id_lte", &self.id_lte),
            ("sort", &self.sort),
        ];
        let mut query: Vec<(String, String)> = fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
            .collect();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

/// One page of `GET /user-bonuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBonusSearchResult {
    #[serde(default)]
    pub items: Vec<UserBonus>,
    #[serde(default)]
    pub has_more: bool,
}
