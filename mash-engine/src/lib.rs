//! MASH Engine - DSL Evaluation, Action Handlers, and the Tick Loop
//!
//! This crate sits above `mash-store` and `mash-permission` and turns raw
//! world state into world behaviour: Interaction DSL
//! evaluation (`dsl`), cascade semantics for voiding/destruction
//! (`cascade`), the request envelope and event bus (`envelope`), the
//! long-poll waiter set (`waiter`), agent signup bootstrap (`signup`),
//! action handlers (`actions`), and the tick engine itself (`tick`).

pub mod cascade;
pub mod dsl;
pub mod envelope;
pub mod error;
pub mod signup;
pub mod waiter;

pub mod actions;
pub mod tick;

pub use error::{ActionError, ActionResult};
pub use waiter::WaiterSet;
