//! # Ground Store - Session Resource Store
//!
//! Each dispatch session owns exactly one [`Store`]. The store builds its
//! file backend and database connection lazily through injected builders,
//! memoizes them, and releases them on disposal.
//!
//! ## Ownership Rules
//!
//! - A handle is built at most once per store (successful builds only).
//! - [`Store::spawn_child`] shares the builders, never the built handles.
//! - [`Store::dispose`] is idempotent and never fails; release errors are logged.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod backend;
pub mod store;

pub use backend::{
    DbConnection, DbConnectionBuilder, DbConnectionHandle, FileBackend, FileBackendBuilder,
    FileBackendHandle, StoreBuilders,
};
pub use store::Store;
