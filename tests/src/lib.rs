//! # Ground Test Suite
//!
//! Unified test crate for behavior that spans more than one workspace crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # In-memory backends, sample messages and handlers
//! └── integration/
//!     ├── dispatch_flows.rs   # Request/notification routing end to end
//!     ├── session_flows.rs    # Store ownership across request and notification sessions
//!     └── env_flows.rs        # Environment snapshot and logging bootstrap
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ground-tests
//!
//! # By category
//! cargo test -p ground-tests integration::dispatch_flows
//! cargo test -p ground-tests integration::session_flows
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
