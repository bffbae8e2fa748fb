//! # Operations Module
//!
//! Everything needed to turn an accepted operation into created objects.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`machine`] | Pure resolution state machine (submit, retry, resume, poll, reconcile) |
//! | [`poller`] | Polls an operation until it is terminal |
//! | [`reconcile`] | Maps the operation log back to submitted items and fetches them |

pub mod machine;
pub mod poller;
pub mod reconcile;
