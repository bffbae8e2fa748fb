//! Creation request building and response-shape decoding.

use crate::transport::ApiRequest;
use crate::types::batch::UserBonusBatchCreateResult;
use crate::types::bonus::UserBonus;
use crate::types::operation::Operation;
use crate::types::ITEM_INDEX_KEY;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use uuid::Uuid;

pub(crate) const USER_BONUSES_PATH: &str = "/user-bonuses";

/// What `POST /user-bonuses` answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    Bonus(UserBonus),
    Batch(UserBonusBatchCreateResult),
    Operation(Operation),
}

impl Submitted {
    /// Decode a successful creation response.
    ///
    /// 202 always carries an operation. Otherwise an object with `status` and `type`
    /// is an operation, an object with `items` is a batch result, and anything else
    /// must be a bonus.
    pub fn decode(status: u16, body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::unexpected_response(
                "creation response is not a JSON object",
                ErrorContext::new()
                    .with_status_code(status)
                    .with_source("submitter"),
            ));
        };

        let looks_like_operation = obj.contains_key("status") && obj.contains_key("type");
        if status == 202 || looks_like_operation {
            return Ok(Submitted::Operation(serde_json::from_value(value)?));
        }
        if obj.contains_key("items") {
            return Ok(Submitted::Batch(serde_json::from_value(value)?));
        }
        Ok(Submitted::Bonus(serde_json::from_value(value)?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Submitted::Bonus(_) => "bonus",
            Submitted::Batch(_) => "batch",
            Submitted::Operation(_) => "operation",
        }
    }
}

/// Serialize a bonus for submission, tagging it with its index when asked.
pub(crate) fn bonus_body(bonus: &UserBonus, index: Option<usize>) -> Result<Value> {
    let mut value = serde_json::to_value(bonus)?;
    if let (Some(idx), Some(obj)) = (index, value.as_object_mut()) {
        obj.insert(ITEM_INDEX_KEY.to_string(), Value::String(idx.to_string()));
    }
    Ok(value)
}

fn mode_query(operation_id: &Uuid, async_mode: bool) -> Vec<(String, String)> {
    vec![
        ("operation_id".to_string(), operation_id.to_string()),
        ("async_mode".to_string(), async_mode.to_string()),
    ]
}

/// `POST /user-bonuses` with a single object.
pub(crate) fn single_request(
    bonus: &UserBonus,
    operation_id: &Uuid,
    async_mode: bool,
    tag_items: bool,
) -> Result<ApiRequest> {
    let body = bonus_body(bonus, tag_items.then_some(0))?;
    Ok(ApiRequest::post(USER_BONUSES_PATH, body).with_query(mode_query(operation_id, async_mode)))
}

/// Wire form of each bonus, as sent in a batch request.
pub(crate) fn bonus_bodies(bonuses: &[UserBonus], tag_items: bool) -> Result<Vec<Value>> {
    bonuses
        .iter()
        .enumerate()
        .map(|(idx, b)| bonus_body(b, tag_items.then_some(idx)))
        .collect()
}

/// `POST /user-bonuses` with an array of objects.
pub(crate) fn batch_request(
    bonuses: &[UserBonus],
    operation_id: &Uuid,
    async_mode: bool,
    skip_invalid_items: Option<bool>,
    tag_items: bool,
) -> Result<ApiRequest> {
    let items = bonus_bodies(bonuses, tag_items)?;

    let mut query = mode_query(operation_id, async_mode);
    if let Some(skip) = skip_invalid_items {
        query.push(("skip_invalid_items".to_string(), skip.to_string()));
    }
    Ok(ApiRequest::post(USER_BONUSES_PATH, Value::Array(items)).with_query(query))
}
