//! Bonus client.
//!
//! The public surface is [`BonusClient`] and its builder. Creation logic lives in
//! `bonuses`; request building and response-shape decoding in [`submit`].

mod bonuses;
pub mod builder;
pub mod context;
pub mod core;
pub mod policy;
pub mod submit;

pub use builder::BonusClientBuilder;
pub use context::CallContext;
pub use self::core::BonusClient;
pub use policy::RetryPolicy;
pub use submit::Submitted;
