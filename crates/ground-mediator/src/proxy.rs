//! # Capability Proxy
//!
//! The only view of the dispatcher a handler ever gets. It exposes the
//! session (id, environment snapshot, store) and lets the handler act as a
//! caller itself through [`Mediate`](crate::Mediate). Registries and the
//! deferred queue are not reachable from here.
//!
//! A proxy is bound to one session and must not outlive the handler
//! invocation it was built for.

use crate::dispatch::Dispatcher;
use crate::mediator::Mediate;
use async_trait::async_trait;
use ground_store::Store;
use ground_types::{DispatchResult, GlobalEnv, Notification, Request, SessionId};
use std::fmt;
use std::sync::Arc;

/// Session-bound façade handed to handler constructors.
#[derive(Clone)]
pub struct MediatorProxy {
    dispatcher: Dispatcher,
}

impl MediatorProxy {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.dispatcher.session_id()
    }

    /// Environment snapshot of the bound session.
    #[must_use]
    pub fn env(&self) -> &Arc<GlobalEnv> {
        self.dispatcher.session().env()
    }

    /// Resource store of the bound session.
    #[must_use]
    pub fn store(&self) -> &Store {
        self.dispatcher.session().store()
    }
}

impl fmt::Debug for MediatorProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorProxy")
            .field("session_id", &self.session_id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Mediate for MediatorProxy {
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
