//! # Ground Types
//!
//! Shared vocabulary for the Ground dispatch engine.
//!
//! ## Design Principles
//!
//! - **Runtime type is the routing key**: a message's concrete Rust type selects
//!   its handlers. `Request` and `Notification` are disjoint contracts.
//! - **Errors are values**: every fallible operation returns a `Result`; panics
//!   inside handler code are converted at the dispatcher boundary.
//! - **Immutable environment**: sessions capture an `Arc<GlobalEnv>` snapshot at
//!   construction and never observe later replacements.

pub mod env;
pub mod errors;
pub mod message;
pub mod outcome;
pub mod session;

pub use env::{DatabaseSettings, EnvLoader, GlobalEnv};
pub use errors::*;
pub use message::{message_type_name, Notification, Request};
pub use outcome::{collect_outcomes, DispatchResult, DispatchResultExt, HandlerResult};
pub use session::SessionId;
