//! # Types Module
//!
//! Wire types of the user-bonus API.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UserBonus`] | A bonus, both as a creation request and as the persisted record |
//! | [`Operation`] | Server-tracked asynchronous task |
//! | [`OperationLogItem`] | Per-item outcome of an operation |
//! | [`UserBonusBatchCreateResult`] | Batch outcome keyed by submitted index |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bonus`] | Bonuses, request parameters, search |
//! | [`operation`] | Operations and operation logs |
//! | [`batch`] | Batch creation results |

pub mod batch;
pub mod bonus;
pub mod operation;

pub use batch::UserBonusBatchCreateResult;
pub use bonus::{
    UserBonus, UserBonusCreateRequestParameters, UserBonusSearchRequest, UserBonusSearchResult,
    UserBonusesCreateRequestParameters,
};
pub use operation::{Operation, OperationDetails, OperationLogItem, OperationStatus};

/// Key under which each submitted item carries its position on the wire.
pub const ITEM_INDEX_KEY: &str = "__item_idx";
