//! # Dispatch Outcomes
//!
//! Result aliases and the small algebra the "OrDefault" call variants are
//! built on: "no handler" is a legitimate absence, every other error is a
//! failure worth reporting.

use crate::errors::{DispatchError, HandlerError};

/// Result of a dispatch call.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result produced by handler logic.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Combinators over [`DispatchResult`].
pub trait DispatchResultExt<T> {
    /// Turn `NoHandlerRegistered` into `None`, keep everything else.
    fn absent_if_unhandled(self) -> Option<DispatchResult<T>>;

    /// `true` when the error is `NoHandlerRegistered`.
    fn is_unhandled(&self) -> bool;
}

impl<T> DispatchResultExt<T> for DispatchResult<T> {
    fn absent_if_unhandled(self) -> Option<DispatchResult<T>> {
        match self {
            Err(DispatchError::NoHandlerRegistered { .. }) => None,
            other => Some(other),
        }
    }

    fn is_unhandled(&self) -> bool {
        matches!(self, Err(DispatchError::NoHandlerRegistered { .. }))
    }
}

/// Collapse an ordered list of per-handler results into the values, failing
/// with the first error.
pub fn collect_outcomes<T>(results: Vec<DispatchResult<T>>) -> DispatchResult<Vec<T>> {
    results.into_iter().collect()
}
