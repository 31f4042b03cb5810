//! # Error Types
//!
//! Defines the error taxonomy shared by the resource store and the dispatcher.

use crate::session::SessionId;
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// The two lazily-built backends a session's store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// File storage backend.
    FileStore,
    /// Database connection.
    Database,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileStore => write!(f, "file store"),
            Self::Database => write!(f, "database connection"),
        }
    }
}

/// Errors surfaced by a session's resource store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The injected builder failed. Not cached; a later call retries.
    #[error("Failed to build {backend}: {reason}")]
    BuildFailed { backend: Backend, reason: String },

    /// The store was already disposed.
    #[error("Store disposed, {backend} is no longer available")]
    Disposed { backend: Backend },

    /// Releasing a built handle failed.
    #[error("Failed to release {backend}: {reason}")]
    ReleaseFailed { backend: Backend, reason: String },
}

impl StoreError {
    /// Shorthand for a builder failure.
    pub fn build_failed(backend: Backend, reason: impl Into<String>) -> Self {
        Self::BuildFailed {
            backend,
            reason: reason.into(),
        }
    }
}

/// Errors returned by handler logic.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler refused the message.
    #[error("{0}")]
    Rejected(String),

    /// A store access failed inside the handler.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A nested dispatch issued through the proxy failed.
    #[error(transparent)]
    Dispatch(Box<DispatchError>),

    /// Any other failure from the handler's own dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Create a rejection with a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

impl From<DispatchError> for HandlerError {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(Box::new(value))
    }
}

/// Which handler contract a registration was expected to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    /// `RequestHandler<M>`.
    Request,
    /// `NotificationHandler<M>`.
    Notification,
}

impl fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request handler"),
            Self::Notification => write!(f, "notification handler"),
        }
    }
}

/// Errors surfaced by the dispatcher to its callers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered for the message type.
    #[error("No handler registered for {message_type}")]
    NoHandlerRegistered { message_type: &'static str },

    /// The handler factory failed or panicked.
    #[error("Failed to construct handler {handler}: {reason}")]
    HandlerConstructionFailed { handler: &'static str, reason: String },

    /// The registered factory does not produce the expected handler shape.
    #[error("Handler {handler} is not a {expected} for {message_type}")]
    HandlerTypeMismatch {
        handler: &'static str,
        message_type: &'static str,
        expected: HandlerShape,
    },

    /// The handler panicked while running.
    #[error("Handler {handler} panicked: {reason}")]
    HandlerInvocationFailed { handler: &'static str, reason: String },

    /// The handler returned an error.
    #[error("Handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: HandlerError,
    },

    /// The session that would run the dispatch is no longer active.
    #[error("Session {session_id} is no longer active")]
    Disposed { session_id: SessionId },
}

/// Coarse category of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    NoHandlerRegistered,
    HandlerConstructionFailed,
    HandlerTypeMismatch,
    HandlerInvocationFailed,
    Handler,
    Disposed,
}

impl DispatchError {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            Self::NoHandlerRegistered { .. } => DispatchErrorKind::NoHandlerRegistered,
            Self::HandlerConstructionFailed { .. } => DispatchErrorKind::HandlerConstructionFailed,
            Self::HandlerTypeMismatch { .. } => DispatchErrorKind::HandlerTypeMismatch,
            Self::HandlerInvocationFailed { .. } => DispatchErrorKind::HandlerInvocationFailed,
            Self::Handler { .. } => DispatchErrorKind::Handler,
            Self::Disposed { .. } => DispatchErrorKind::Disposed,
        }
    }

    /// The error the handler itself returned, if that is what this is.
    #[must_use]
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors loading the environment snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvError {
    /// A required key is absent.
    #[error("Missing configuration key: {key}")]
    MissingKey { key: String },

    /// A key is present but cannot be parsed.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The settings file exists but could not be read or parsed.
    #[error("Failed to load settings file {path}: {reason}")]
    SettingsFile { path: String, reason: String },
}

/// Best-effort text of a caught panic payload.
#[must_use]
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
