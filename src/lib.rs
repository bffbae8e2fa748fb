//! # user-bonus-client
//!
//! Client for the crowdsourcing platform's user-bonus API.
//!
//! ## Overview
//!
//! Creating bonuses looks synchronous from the caller's side, but the server is free
//! to execute any creation request asynchronously. When it does, the client follows
//! the returned operation to completion, reads the operation log to recover the
//! identifiers of the created records and re-fetches them, so the caller always
//! receives fully populated objects.
//!
//! ## Key Features
//!
//! - **Sync-over-async**: [`BonusClient::create_user_bonus`] and
//!   [`BonusClient::create_user_bonuses`] resolve operations transparently
//! - **Idempotent retries**: one `operation_id` per logical call, reused on every
//!   retry; `OPERATION_ALREADY_EXISTS` resumes the original operation
//! - **Explicit state machine**: retry/resume decisions live in
//!   [`operations::machine`] and are testable without a network
//! - **Per-item validation**: batch rejections are reported inline in
//!   [`UserBonusBatchCreateResult::validation_errors`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use user_bonus_client::{BonusClientBuilder, UserBonus, UserBonusCreateRequestParameters};
//!
//! #[tokio::main]
//! async fn main() -> user_bonus_client::Result<()> {
//!     let client = BonusClientBuilder::new()
//!         .with_base_url("https://toloka.dev/api/v1")
//!         .with_token("your-token")
//!         .build()?;
//!
//!     let bonus = UserBonus::new("user-1", Decimal::new(150, 2))
//!         .with_private_comment("pool_23214");
//!     let created = client
//!         .create_user_bonus(&bonus, UserBonusCreateRequestParameters::default())
//!         .await?;
//!     println!("created {:?}", created.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, request submission and public create calls |
//! | [`operations`] | Resolution state machine, poller and reconciler |
//! | [`types`] | Wire types (bonuses, operations, batch results) |
//! | [`transport`] | HTTP transport seam |
//! | [`error_code`] | Platform API error codes |

pub mod client;
pub mod error_code;
pub mod operations;
pub mod transport;
pub mod types;

pub use client::{BonusClient, BonusClientBuilder, CallContext, RetryPolicy};
pub use operations::poller::PollConfig;
pub use types::{
    batch::UserBonusBatchCreateResult,
    bonus::{
        UserBonus, UserBonusCreateRequestParameters, UserBonusSearchRequest,
        UserBonusSearchResult, UserBonusesCreateRequestParameters,
    },
    operation::{Operation, OperationDetails, OperationLogItem, OperationStatus},
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
