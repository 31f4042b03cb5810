//! # Ground Mediator - In-Process Request/Notification Dispatch
//!
//! Routes typed messages to registered handler logic so that independently
//! compiled modules can talk without holding references to each other.
//!
//! ## Flow
//!
//! ```text
//!                  ┌──────────────────────┐
//!  request_first ─▶│      Mediator        │── lookup ──▶ HandlerRegistry
//!  notify_all   ─▶│ (session + store +   │
//!                  │  deferred queue)     │── factory(proxy) ──▶ handler
//!                  └──────────┬───────────┘
//!                             │ dispose()
//!                             ▼
//!            release own store, then run queued notifications
//!            in scheduling order, each in its own session
//! ```
//!
//! ## Rules
//!
//! - **Requests** run now, in the caller's session, sharing its store.
//! - **Notifications** are scheduled now and run only when the scheduling
//!   session is disposed, each with a fresh session and a child store.
//! - **Handlers** see a [`MediatorProxy`], never the registries or the queue.
//! - **Panics** in handler construction or invocation become
//!   [`DispatchError`](ground_types::DispatchError) values.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod deferred;
mod dispatch;
pub mod handler;
pub mod mediator;
pub mod proxy;
pub mod registry;
pub mod session;

// Re-export main types
pub use deferred::{DeferredFailure, DisposalReport};
pub use handler::{
    FromProxy, NotificationFactory, NotificationHandler, RequestFactory, RequestHandler,
};
pub use mediator::{Mediate, Mediator};
pub use proxy::MediatorProxy;
pub use registry::{HandlerDescriptor, HandlerRegistry, HandlerTable};
pub use session::{LifecycleState, Session};
