//! # Mediator
//!
//! Owner-facing dispatcher. One `Mediator` is one request session: it owns
//! that session's store and its deferred-notification queue, and shares the
//! two handler registries with every session created from it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mediator = Mediator::new(builders);
//! mediator.overwrite_requests(HandlerTable::new().request::<Ping, EchoHandler>());
//! mediator.overwrite_notifications(HandlerTable::new().notification::<Pong, AuditHandler>());
//!
//! let echoed = mediator.request_first(&Ping("hello".into())).await?;
//! mediator.notify_all(Pong::Saved)?;       // queued, not run
//!
//! let report = mediator.dispose().await;   // store released, then Pong handlers run
//! ```

use crate::deferred::DisposalReport;
use crate::dispatch::{Dispatcher, Routing};
use crate::proxy::MediatorProxy;
use crate::registry::{HandlerRegistry, HandlerTable};
use crate::session::{EnvSource, LifecycleState};
use async_trait::async_trait;
use ground_store::{Store, StoreBuilders};
use ground_types::{DispatchResult, GlobalEnv, Notification, Request, SessionId};
use std::sync::Arc;
use tracing::warn;

/// Anything that can dispatch: the [`Mediator`] itself, or a
/// [`MediatorProxy`] handed to handler code.
///
/// Requests run immediately against the caller's session. Notifications are
/// only scheduled: each matched handler gets a fresh session and runs when the
/// scheduling session is disposed.
#[async_trait]
pub trait Mediate: Send + Sync {
    /// Run the first-registered handler for `M`.
    ///
    /// # Errors
    ///
    /// `NoHandlerRegistered` when nothing handles `M`, or any failure from
    /// constructing or running the handler.
    async fn request_first<M: Request>(&self, request: &M) -> DispatchResult<M::Output>;

    /// Like [`request_first`](Self::request_first), but `None` when nothing
    /// handles `M`.
    async fn request_first_or_default<M: Request>(
        &self,
        request: &M,
    ) -> Option<DispatchResult<M::Output>>;

    /// Run every handler for `M` in registration order, stopping after the
    /// first failure. The failing result is the last element.
    async fn request_all<M: Request>(&self, request: &M) -> Vec<DispatchResult<M::Output>>;

    /// Schedule the first-registered handler for `M`.
    ///
    /// # Errors
    ///
    /// `NoHandlerRegistered`, or a construction failure reported now.
    fn notify_first<M: Notification>(&self, notification: M) -> DispatchResult<()>;

    /// Like [`notify_first`](Self::notify_first), but `None` when nothing
    /// handles `M`.
    fn notify_first_or_default<M: Notification>(
        &self,
        notification: M,
    ) -> Option<DispatchResult<()>>;

    /// Schedule every handler for `M` in registration order, stopping at the
    /// first scheduling failure. Entries already scheduled stay queued.
    fn notify_all<M: Notification>(&self, notification: M) -> DispatchResult<()>;
}

/// The dispatcher owned by bootstrap code.
pub struct Mediator {
    dispatcher: Dispatcher,
}

impl Mediator {
    /// Sessions read the process-wide environment snapshot current at their
    /// creation.
    #[must_use]
    pub fn new(builders: StoreBuilders) -> Self {
        Self::from_routing(Arc::new(Routing::new(builders, EnvSource::Global)))
    }

    /// Every session uses the given snapshot.
    #[must_use]
    pub fn with_env(builders: StoreBuilders, env: Arc<GlobalEnv>) -> Self {
        Self::from_routing(Arc::new(Routing::new(builders, EnvSource::Fixed(env))))
    }

    fn from_routing(routing: Arc<Routing>) -> Self {
        Self {
            dispatcher: Dispatcher::new(routing),
        }
    }

    /// Replace the request routing table. Visible to every sibling session.
    pub fn overwrite_requests(&self, table: HandlerTable) {
        self.dispatcher.routing().requests.overwrite(table);
    }

    /// Replace the notification routing table. Visible to every sibling session.
    pub fn overwrite_notifications(&self, table: HandlerTable) {
        self.dispatcher.routing().notifications.overwrite(table);
    }

    #[must_use]
    pub fn requests(&self) -> &HandlerRegistry {
        &self.dispatcher.routing().requests
    }

    #[must_use]
    pub fn notifications(&self) -> &HandlerRegistry {
        &self.dispatcher.routing().notifications
    }

    /// A sibling mediator: same registries and builders, new session with its
    /// own store and an empty queue.
    #[must_use]
    pub fn new_session(&self) -> Mediator {
        Self::from_routing(Arc::clone(self.dispatcher.routing()))
    }

    /// A proxy bound to this mediator's own session.
    #[must_use]
    pub fn proxy(&self) -> MediatorProxy {
        self.dispatcher.proxy()
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.dispatcher.session_id()
    }

    #[must_use]
    pub fn env(&self) -> &Arc<GlobalEnv> {
        self.dispatcher.session().env()
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        self.dispatcher.session().store()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.dispatcher.state()
    }

    /// Entries waiting for [`dispose`](Self::dispose).
    #[must_use]
    pub fn pending_notifications(&self) -> usize {
        self.dispatcher.pending_notifications()
    }

    /// Release the session store, then run every queued notification in
    /// scheduling order. Failing entries are logged and skipped.
    ///
    /// A second call is a no-op returning an empty report.
    pub async fn dispose(&self) -> DisposalReport {
        self.dispatcher.dispose().await
    }
}

impl Drop for Mediator {
    fn drop(&mut self) {
        let pending = self.dispatcher.pending_notifications();
        if self.dispatcher.state() == LifecycleState::Active && pending > 0 {
            warn!(
                session_id = %self.session_id(),
                pending,
                "Mediator dropped without dispose, queued notifications will not run"
            );
        }
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("session_id", &self.session_id())
            .field("state", &self.state())
            .field("pending_notifications", &self.pending_notifications())
            .finish()
    }
}

#[async_trait]
impl Mediate for Mediator {
    async fn request_first<M: Request>(&self, request: &M) -> DispatchResult<M::Output> {
        self.dispatcher.request_first(request).await
    }

    async fn request_first_or_default<M: Request>(
        &self,
        request: &M,
    ) -> Option<DispatchResult<M::Output>> {
        self.dispatcher.request_first_or_default(request).await
    }

    async fn request_all<M: Request>(&self, request: &M) -> Vec<DispatchResult<M::Output>> {
        self.dispatcher.request_all(request).await
    }

    fn notify_first<M: Notification>(&self, notification: M) -> DispatchResult<()> {
        self.dispatcher.notify_first(notification)
    }

    fn notify_first_or_default<M: Notification>(
        &self,
        notification: M,
    ) -> Option<DispatchResult<()>> {
        self.dispatcher.notify_first_or_default(notification)
    }

    fn notify_all<M: Notification>(&self, notification: M) -> DispatchResult<()> {
        self.dispatcher.notify_all(notification)
    }
}
