//! # Dispatch Core
//!
//! Lookup, handler construction, invocation and the deferred queue for one
//! session. `Mediator` owns a `Dispatcher` for its request session; every
//! scheduled notification gets a child `Dispatcher` of its own.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──dispose()──▶ Disposing ──queue drained──▶ Disposed
//!   │                      │
//!   │ request*/notify*     │ 1. release own store
//!   │                      │ 2. run entries in insertion order
//!   ▼                      ▼
//! handlers run / queue   dispatch calls rejected
//! ```

use crate::deferred::{DeferredFailure, DeferredNotification, DeferredWork, DisposalReport};
use crate::proxy::MediatorProxy;
use crate::registry::{HandlerDescriptor, HandlerRegistry};
use crate::session::{EnvSource, LifecycleState, Session};
use futures::FutureExt;
use ground_store::{Store, StoreBuilders};
use ground_types::{
    describe_panic, message_type_name, DispatchError, DispatchResult, HandlerResult,
    Notification, Request, SessionId,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, debug_span, info, warn, Instrument};

/// Routing state shared by every session created from one mediator.
pub(crate) struct Routing {
    pub(crate) requests: HandlerRegistry,
    pub(crate) notifications: HandlerRegistry,
    pub(crate) builders: StoreBuilders,
    pub(crate) env_source: EnvSource,
}

impl Routing {
    pub(crate) fn new(builders: StoreBuilders, env_source: EnvSource) -> Self {
        Self {
            requests: HandlerRegistry::new(),
            notifications: HandlerRegistry::new(),
            builders,
            env_source,
        }
    }
}

/// Per-session state. Owned by exactly one dispatcher lineage.
pub(crate) struct Scope {
    session: Session,
    state: Mutex<LifecycleState>,
    deferred: Mutex<VecDeque<DeferredNotification>>,
}

impl Scope {
    fn new(session: Session) -> Self {
        Self {
            session,
            state: Mutex::new(LifecycleState::Active),
            deferred: Mutex::new(VecDeque::new()),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Dispatcher {
    routing: Arc<Routing>,
    scope: Arc<Scope>,
}

impl Dispatcher {
    /// A dispatcher for a fresh session with its own store.
    pub(crate) fn new(routing: Arc<Routing>) -> Self {
        let store = Store::new(routing.builders.clone());
        Self::with_store(routing, store)
    }

    fn with_store(routing: Arc<Routing>, store: Store) -> Self {
        let session = Session::new(routing.env_source.snapshot(), store);
        debug!(session_id = %session.id(), "Session created");
        Self {
            routing,
            scope: Arc::new(Scope::new(session)),
        }
    }

    /// Session for a scheduled notification: fresh id, fresh snapshot, child store.
    fn spawn_notification_scope(&self) -> Self {
        let store = self.scope.session.store().spawn_child();
        Self::with_store(Arc::clone(&self.routing), store)
    }

    pub(crate) fn routing(&self) -> &Arc<Routing> {
        &self.routing
    }

    pub(crate) fn session(&self) -> &Session {
        &self.scope.session
    }

    pub(crate) fn session_id(&self) -> SessionId {
        self.scope.session.id()
    }

    pub(crate) fn state(&self) -> LifecycleState {
        *self.scope.state.lock()
    }

    pub(crate) fn pending_notifications(&self) -> usize {
        self.scope.deferred.lock().len()
    }

    pub(crate) fn proxy(&self) -> MediatorProxy {
        MediatorProxy::new(self.clone())
    }

    fn ensure_active(&self) -> DispatchResult<()> {
        match self.state() {
            LifecycleState::Active => Ok(()),
            _ => Err(DispatchError::Disposed {
                session_id: self.session_id(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    pub(crate) async fn request_first<M: Request>(&self, request: &M) -> DispatchResult<M::Output> {
        self.ensure_active()?;
        let descriptor = self.routing.requests.lookup_first(request)?;
        self.execute_request(&descriptor, request).await
    }

    pub(crate) async fn request_first_or_default<M: Request>(
        &self,
        request: &M,
    ) -> Option<DispatchResult<M::Output>> {
        if let Err(e) = self.ensure_active() {
            return Some(Err(e));
        }
        let Some(descriptor) = self.routing.requests.lookup_first_optional(request) else {
            debug!(
                message_type = message_type_name::<M>(),
                "No request handler, nothing to call"
            );
            return None;
        };
        Some(self.execute_request(&descriptor, request).await)
    }

    pub(crate) async fn request_all<M: Request>(
        &self,
        request: &M,
    ) -> Vec<DispatchResult<M::Output>> {
        if let Err(e) = self.ensure_active() {
            return vec![Err(e)];
        }
        let descriptors = match self.routing.requests.lookup_all(request) {
            Ok(descriptors) => descriptors,
            Err(e) => return vec![Err(e)],
        };

        let mut results = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let result = self.execute_request(descriptor, request).await;
            let failed = result.is_err();
            results.push(result);
            if failed {
                debug!(
                    message_type = message_type_name::<M>(),
                    handler = descriptor.name(),
                    completed = results.len(),
                    registered = descriptors.len(),
                    "Request fan-out stopped at failing handler"
                );
                break;
            }
        }
        results
    }

    async fn execute_request<M: Request>(
        &self,
        descriptor: &HandlerDescriptor,
        request: &M,
    ) -> DispatchResult<M::Output> {
        let name = descriptor.name();
        let factory = descriptor.request_factory::<M>()?;
        let handler = construct(name, self.proxy(), |proxy| factory(proxy))?;

        debug!(
            session_id = %self.session_id(),
            message_type = message_type_name::<M>(),
            handler = name,
            "Invoking request handler"
        );

        match AssertUnwindSafe(handler.handle(request)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(DispatchError::Handler {
                handler: name,
                source,
            }),
            Err(panic) => Err(DispatchError::HandlerInvocationFailed {
                handler: name,
                reason: describe_panic(&*panic),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub(crate) fn notify_first<M: Notification>(&self, notification: M) -> DispatchResult<()> {
        self.ensure_active()?;
        let descriptor = self.routing.notifications.lookup_first(&notification)?;
        self.schedule(&descriptor, Arc::new(notification))
    }

    pub(crate) fn notify_first_or_default<M: Notification>(
        &self,
        notification: M,
    ) -> Option<DispatchResult<()>> {
        if let Err(e) = self.ensure_active() {
            return Some(Err(e));
        }
        let descriptor = self
            .routing
            .notifications
            .lookup_first_optional(&notification)?;
        Some(self.schedule(&descriptor, Arc::new(notification)))
    }

    pub(crate) fn notify_all<M: Notification>(&self, notification: M) -> DispatchResult<()> {
        self.ensure_active()?;
        let descriptors = self.routing.notifications.lookup_all(&notification)?;
        let notification = Arc::new(notification);
        for descriptor in &descriptors {
            self.schedule(descriptor, Arc::clone(&notification))?;
        }
        Ok(())
    }

    /// Build the handler against a new session now, queue its invocation.
    fn schedule<M: Notification>(
        &self,
        descriptor: &HandlerDescriptor,
        notification: Arc<M>,
    ) -> DispatchResult<()> {
        let name = descriptor.name();
        let message_type = message_type_name::<M>();
        let factory = descriptor.notification_factory::<M>()?;

        let child = self.spawn_notification_scope();
        let handler = construct(name, child.proxy(), |proxy| factory(proxy))?;
        let session_id = child.session_id();

        let span = debug_span!(
            "deferred_notification",
            handler = name,
            message_type,
            session_id = %session_id
        );
        let work: DeferredWork = Box::new(move || {
            async move {
                let outcome = match AssertUnwindSafe(handler.handle(&notification))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(source)) => Err(DispatchError::Handler {
                        handler: name,
                        source,
                    }),
                    Err(panic) => Err(DispatchError::HandlerInvocationFailed {
                        handler: name,
                        reason: describe_panic(&*panic),
                    }),
                };
                // Handler no longer needs the session; nested work drains here
                drop(handler);
                child.dispose().await;
                outcome
            }
            .instrument(span)
            .boxed()
        });

        let queued = {
            let mut deferred = self.scope.deferred.lock();
            deferred.push_back(DeferredNotification::new(name, message_type, session_id, work));
            deferred.len()
        };
        debug!(
            session_id = %self.session_id(),
            notification_session = %session_id,
            message_type,
            handler = name,
            queued,
            "Notification scheduled"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Disposal
    // ------------------------------------------------------------------

    /// Release the session store, then drain the deferred queue in order.
    ///
    /// Only the first call does anything; later calls return an empty report.
    pub(crate) async fn dispose(&self) -> DisposalReport {
        {
            let mut state = self.scope.state.lock();
            if *state != LifecycleState::Active {
                return DisposalReport::default();
            }
            *state = LifecycleState::Disposing;
        }

        self.scope.session.store().dispose().await;

        let mut report = DisposalReport::default();
        loop {
            // Lock is released before the entry runs
            let next = self.scope.deferred.lock().pop_front();
            let Some(entry) = next else {
                break;
            };

            let (handler, message_type, session_id) =
                (entry.handler, entry.message_type, entry.session_id);
            report.executed += 1;
            if let Err(error) = entry.run().await {
                warn!(
                    session_id = %self.session_id(),
                    notification_session = %session_id,
                    message_type,
                    handler,
                    error = %error,
                    "Deferred notification failed, continuing"
                );
                report.failures.push(DeferredFailure {
                    handler,
                    message_type,
                    session_id,
                    error,
                });
            }
        }

        *self.scope.state.lock() = LifecycleState::Disposed;
        info!(
            session_id = %self.session_id(),
            executed = report.executed,
            failed = report.failed(),
            "Session disposed"
        );
        report
    }
}

/// Run a handler factory, turning errors and panics into construction failures.
fn construct<H: ?Sized>(
    handler: &'static str,
    proxy: MediatorProxy,
    factory: impl FnOnce(MediatorProxy) -> HandlerResult<Box<H>>,
) -> DispatchResult<Box<H>> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| factory(proxy))) {
        Ok(Ok(instance)) => Ok(instance),
        Ok(Err(e)) => Err(DispatchError::HandlerConstructionFailed {
            handler,
            reason: e.to_string(),
        }),
        Err(panic) => Err(DispatchError::HandlerConstructionFailed {
            handler,
            reason: describe_panic(&*panic),
        }),
    }
}
