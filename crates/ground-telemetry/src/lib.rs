//! # Ground Telemetry
//!
//! Logging bootstrap for binaries embedding the Ground dispatch engine. The
//! library crates only emit `tracing` events; this crate decides where they go.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ground_telemetry::{init_tracing, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_tracing(&config).expect("Failed to init tracing");
//!
//!     // Dispatch events are now written to stdout
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Filter directives, wins over `GROUND_LOG_LEVEL` |
//! | `GROUND_LOG_LEVEL` | `info` | Fallback filter directives |
//! | `GROUND_JSON_LOGS` | `false` (`true` in containers) | JSON lines output |
//! | `GROUND_CONSOLE_OUTPUT` | `true` | Write events to stdout |
//! | `GROUND_SERVICE_NAME` | `ground` | Service name in the startup line |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{build_filter, init_tracing, TracingGuard};

#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("Invalid log filter {directive:?}: {reason}")]
    InvalidFilter { directive: String, reason: String },
}

/// Convenience macro for creating a span with session context.
///
/// # Example
///
/// ```rust,ignore
/// use ground_telemetry::dispatch_span;
///
/// let span = dispatch_span!("checkout", mediator.session_id(), order_id = 42);
/// async { /* dispatch calls */ }.instrument(span).await;
/// ```
#[macro_export]
macro_rules! dispatch_span {
    ($name:expr, $session_id:expr) => {
        $crate::tracing::info_span!($name, session_id = %$session_id)
    };
    ($name:expr, $session_id:expr, $($field:tt)*) => {
        $crate::tracing::info_span!($name, session_id = %$session_id, $($field)*)
    };
}
