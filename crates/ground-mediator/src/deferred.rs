//! # Deferred Notification Queue Entries
//!
//! A scheduled notification is a boxed callback that already owns its
//! handler, its message and its session. Running it invokes the handler and
//! then disposes that session.

use futures::future::BoxFuture;
use ground_types::{DispatchError, DispatchResult, SessionId};
use std::fmt;

pub(crate) type DeferredWork = Box<dyn FnOnce() -> BoxFuture<'static, DispatchResult<()>> + Send>;

/// One queued notification callback.
pub(crate) struct DeferredNotification {
    pub(crate) handler: &'static str,
    pub(crate) message_type: &'static str,
    pub(crate) session_id: SessionId,
    work: DeferredWork,
}

impl DeferredNotification {
    pub(crate) fn new(
        handler: &'static str,
        message_type: &'static str,
        session_id: SessionId,
        work: DeferredWork,
    ) -> Self {
        Self {
            handler,
            message_type,
            session_id,
            work,
        }
    }

    /// Consume the entry. Runs at most once by construction.
    pub(crate) async fn run(self) -> DispatchResult<()> {
        (self.work)().await
    }
}

impl fmt::Debug for DeferredNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredNotification")
            .field("handler", &self.handler)
            .field("message_type", &self.message_type)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// A queued notification that failed while the queue was drained.
#[derive(Debug)]
pub struct DeferredFailure {
    pub handler: &'static str,
    pub message_type: &'static str,
    pub session_id: SessionId,
    pub error: DispatchError,
}

/// What happened while a dispatcher drained its deferred queue.
#[derive(Debug, Default)]
pub struct DisposalReport {
    /// Entries that ran, successful or not.
    pub executed: usize,
    /// One record per entry that failed, in execution order.
    pub failures: Vec<DeferredFailure>,
}

impl DisposalReport {
    /// Number of entries that ran and failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of entries that ran and succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.executed - self.failures.len()
    }

    /// `true` when nothing was queued, or when disposal had already happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executed == 0
    }
}
