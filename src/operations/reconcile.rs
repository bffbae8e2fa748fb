//! Turning a successful operation back into the objects it created.
//!
//! Log entries are matched to submitted items by their `__item_idx` tag, never by
//! their position in the log. Entries of untagged submissions are matched by the
//! input they echo.

use crate::client::context::CallContext;
use crate::types::batch::UserBonusBatchCreateResult;
use crate::types::bonus::{UserBonus, UserBonusSearchRequest, UserBonusSearchResult};
use crate::types::operation::{Operation, OperationLogItem};
use crate::types::ITEM_INDEX_KEY;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use tracing::{debug, warn};

/// Reads needed to reconcile an operation.
#[async_trait]
pub trait BonusLookup: Send + Sync {
    async fn fetch_operation_log(
        &self,
        operation_id: &str,
        ctx: &CallContext,
    ) -> Result<Vec<OperationLogItem>>;

    async fn fetch_user_bonus(&self, id: &str, ctx: &CallContext) -> Result<UserBonus>;

    async fn search_user_bonuses(
        &self,
        request: &UserBonusSearchRequest,
        ctx: &CallContext,
    ) -> Result<UserBonusSearchResult>;
}

/// Per-index outcome extracted from an operation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogIndex {
    pub succeeded: BTreeMap<usize, String>,
    pub failed: BTreeMap<usize, Value>,
}

impl LogIndex {
    /// Index the log of an operation that received `submitted`, the items exactly
    /// as they were sent.
    ///
    /// Tagged entries are placed by their tag. An untagged entry belongs to the one
    /// unclaimed item whose fields its `input` echoes; fitting several items is an
    /// error. Entries that fit no submitted item are skipped. With a single
    /// submitted item any untagged entry counts as index 0.
    pub fn build(log: &[OperationLogItem], submitted: &[Value], operation_id: &str) -> Result<Self> {
        let mut index = LogIndex::default();

        for entry in log {
            let Some(idx) = index.locate(entry, submitted, operation_id)? else {
                continue;
            };

            if entry.success {
                let id = entry.user_bonus_id().ok_or_else(|| {
                    Error::reconciliation_with_context(
                        "successful log entry has no user_bonus_id",
                        ErrorContext::new()
                            .with_field_path(format!("log[{}].output", idx))
                            .with_operation_id(operation_id)
                            .with_source("reconciler"),
                    )
                })?;
                index.succeeded.insert(idx, id.to_string());
            } else {
                let detail = entry
                    .output
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({"type": entry.item_type}));
                index.failed.insert(idx, detail);
            }
        }

        if let Some(missing) = (0..submitted.len()).find(|i| !index.claimed(*i)) {
            return Err(Error::reconciliation_with_context(
                format!("operation log has no entry for item {}", missing),
                ErrorContext::new()
                    .with_field_path(format!("items[{}]", missing))
                    .with_operation_id(operation_id)
                    .with_source("reconciler"),
            ));
        }

        Ok(index)
    }

    fn claimed(&self, idx: usize) -> bool {
        self.succeeded.contains_key(&idx) || self.failed.contains_key(&idx)
    }

    /// Submitted index a log entry refers to, or `None` when it should be skipped.
    fn locate(
        &self,
        entry: &OperationLogItem,
        submitted: &[Value],
        operation_id: &str,
    ) -> Result<Option<usize>> {
        if let Some(idx) = entry.item_index() {
            if idx >= submitted.len() {
                warn!(operation_id, idx, submitted = submitted.len(), "log entry for an index that was not submitted");
                return Ok(None);
            }
            if self.claimed(idx) {
                warn!(operation_id, idx, "duplicate log entry, keeping the first one");
                return Ok(None);
            }
            return Ok(Some(idx));
        }

        if submitted.len() == 1 {
            if self.claimed(0) {
                warn!(operation_id, "duplicate log entry, keeping the first one");
                return Ok(None);
            }
            return Ok(Some(0));
        }

        let candidates: Vec<usize> = (0..submitted.len())
            .filter(|i| !self.claimed(*i) && echoes(&entry.input, &submitted[*i]))
            .collect();
        match candidates.as_slice() {
            [idx] => Ok(Some(*idx)),
            [] => {
                warn!(operation_id, entry_type = entry.item_type.as_str(), "log entry matches no submitted item");
                Ok(None)
            }
            several => Err(Error::reconciliation_with_context(
                format!(
                    "untagged log entry matches {} submitted items",
                    several.len()
                ),
                ErrorContext::new()
                    .with_details(format!("candidates: {:?}", several))
                    .with_operation_id(operation_id)
                    .with_source("reconciler"),
            )),
        }
    }
}

/// Whether `input` carries every field of the submitted `item`.
fn echoes(input: &Map<String, Value>, item: &Value) -> bool {
    let Some(fields) = item.as_object() else {
        return false;
    };
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != ITEM_INDEX_KEY)
        .all(|(key, sent)| input.get(key).is_some_and(|echoed| same_value(sent, echoed)))
}

/// Equal values, treating `"2"`, `"2.00"` and `2` as the same amount.
fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_decimal(a), as_decimal(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Fetches the objects created by a successful operation.
#[derive(Debug, Clone)]
pub struct Reconciler {
    page_size: u32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self { page_size: 300 }
    }
}

impl Reconciler {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Resolve a single-item creation to the persisted bonus.
    ///
    /// A rejected item surfaces as [`Error::Validation`] carrying the log output.
    pub async fn single<L>(
        &self,
        lookup: &L,
        operation: &Operation,
        submitted: &Value,
        ctx: &CallContext,
    ) -> Result<UserBonus>
    where
        L: BonusLookup + ?Sized,
    {
        let log = lookup.fetch_operation_log(&operation.id, ctx).await?;
        let index = LogIndex::build(&log, std::slice::from_ref(submitted), &operation.id)?;

        if let Some(id) = index.succeeded.get(&0) {
            return lookup.fetch_user_bonus(id, ctx).await;
        }

        let details = index.failed.get(&0).cloned();
        Err(Error::Validation {
            message: "user bonus was rejected".to_string(),
            details,
            context: ErrorContext::new()
                .with_operation_id(operation.id.clone())
                .with_source("reconciler"),
        })
    }

    /// Resolve a batch creation to a result keyed by submitted index.
    pub async fn batch<L>(
        &self,
        lookup: &L,
        operation: &Operation,
        submitted: &[Value],
        ctx: &CallContext,
    ) -> Result<UserBonusBatchCreateResult>
    where
        L: BonusLookup + ?Sized,
    {
        let log = lookup.fetch_operation_log(&operation.id, ctx).await?;
        let index = LogIndex::build(&log, submitted, &operation.id)?;

        let wanted: BTreeSet<&str> = index.succeeded.values().map(String::as_str).collect();
        let mut found = self.fetch_by_ids(lookup, &wanted, ctx).await?;

        let mut result = UserBonusBatchCreateResult::default();
        for (idx, id) in &index.succeeded {
            let bonus = found.remove(id.as_str()).ok_or_else(|| {
                Error::reconciliation_with_context(
                    format!("created user bonus {} was not found", id),
                    ErrorContext::new()
                        .with_field_path(format!("items[{}]", idx))
                        .with_operation_id(operation.id.clone())
                        .with_source("reconciler"),
                )
            })?;
            result.items.insert(idx.to_string(), bonus);
        }
        for (idx, detail) in index.failed {
            result.validation_errors.insert(idx.to_string(), detail);
        }

        debug!(
            operation_id = operation.id.as_str(),
            created = result.items.len(),
            rejected = result.validation_errors.len(),
            "batch reconciled"
        );
        Ok(result)
    }

    /// Page through `GET /user-bonuses` sorted by id, bounded by the smallest and
    /// largest wanted ids.
    async fn fetch_by_ids<L>(
        &self,
        lookup: &L,
        wanted: &BTreeSet<&str>,
        ctx: &CallContext,
    ) -> Result<HashMap<String, UserBonus>>
    where
        L: BonusLookup + ?Sized,
    {
        let mut found = HashMap::new();
        let (Some(first), Some(last)) = (wanted.first(), wanted.last()) else {
            return Ok(found);
        };

        let mut request = UserBonusSearchRequest {
            id_gte: Some(first.to_string()),
            id_lte: Some(last.to_string()),
            sort: Some("id".to_string()),
            limit: Some(self.page_size),
            ..Default::default()
        };

        loop {
            let page = lookup.search_user_bonuses(&request, ctx).await?;
            let last_seen = page.items.last().and_then(|b| b.id.clone());

            for bonus in page.items {
                if let Some(id) = bonus.id.as_deref() {
                    if wanted.contains(id) {
                        found.insert(id.to_string(), bonus);
                    }
                }
            }

            match last_seen {
                Some(last_id) if page.has_more && found.len() < wanted.len() => {
                    let stalled = request
                        .id_gt
                        .as_deref()
                        .is_some_and(|cursor| last_id.as_str() <= cursor);
                    if stalled {
                        warn!(cursor = last_id.as_str(), "listing did not advance past the cursor");
                        break;
                    }
                    request.id_gte = None;
                    request.id_gt = Some(last_id);
                }
                _ => break,
            }
        }

        Ok(found)
    }
}
