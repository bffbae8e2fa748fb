//! Outcome of creating several bonuses in one call.

use super::bonus::UserBonus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Created bonuses and per-item validation errors, keyed by submitted index.
///
/// Every submitted index is present in exactly one of the two maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBonusBatchCreateResult {
    #[serde(default)]
    pub items: BTreeMap<String, UserBonus>,
    #[serde(default)]
    pub validation_errors: BTreeMap<String, serde_json::Value>,
}

impl UserBonusBatchCreateResult {
    pub fn len(&self) -> usize {
        self.items.len() + self.validation_errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Created bonus at the given submitted position.
    pub fn item(&self, index: usize) -> Option<&UserBonus> {
        self.items.get(&index.to_string())
    }

    /// Validation error at the given submitted position.
    pub fn validation_error(&self, index: usize) -> Option<&serde_json::Value> {
        self.validation_errors.get(&index.to_string())
    }

    /// Whether each of `0..submitted` appears in exactly one map and nothing else does.
    pub fn covers(&self, submitted: usize) -> bool {
        self.len() == submitted
            && (0..submitted).all(|i| {
                let key = i.to_string();
                self.items.contains_key(&key) != self.validation_errors.contains_key(&key)
            })
    }
}
