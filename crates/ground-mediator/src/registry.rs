//! # Handler Registry - Type-Keyed Routing Table
//!
//! Maps a message type to the ordered list of handlers registered for it.
//!
//! ## Features
//!
//! - **Bulk replacement**: the whole table is swapped in one step; readers see
//!   either the old snapshot or the new one, never a mix.
//! - **Registration order**: the first descriptor is the default handler for
//!   first-match dispatch; fan-out walks the list in order.
//! - **Late binding without introspection**: each entry carries a factory that
//!   builds the handler from a proxy.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let table = HandlerTable::new()
//!     .request::<Ping, EchoHandler>()
//!     .notification::<Pong, AuditHandler>()
//!     .notification::<Pong, MailHandler>();
//!
//! registry.overwrite(table);
//! ```

use crate::handler::{
    notification_factory_of, request_factory_of, FromProxy, NotificationFactory,
    NotificationHandler, RequestFactory, RequestHandler,
};
use crate::proxy::MediatorProxy;
use arc_swap::ArcSwap;
use ground_types::{
    message_type_name, DispatchError, DispatchResult, HandlerResult, HandlerShape, Notification,
    Request,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One registered handler: its identifier and the factory that builds it.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: &'static str,
    shape: HandlerShape,
    factory: Arc<dyn Any + Send + Sync>,
}

impl HandlerDescriptor {
    /// Handler identifier, used in errors and log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The contract this handler was registered under.
    #[must_use]
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    pub(crate) fn request_factory<M: Request>(&self) -> DispatchResult<&RequestFactory<M>> {
        self.factory
            .downcast_ref::<RequestFactory<M>>()
            .ok_or(DispatchError::HandlerTypeMismatch {
                handler: self.name,
                message_type: message_type_name::<M>(),
                expected: HandlerShape::Request,
            })
    }

    pub(crate) fn notification_factory<M: Notification>(
        &self,
    ) -> DispatchResult<&NotificationFactory<M>> {
        self.factory
            .downcast_ref::<NotificationFactory<M>>()
            .ok_or(DispatchError::HandlerTypeMismatch {
                handler: self.name,
                message_type: message_type_name::<M>(),
                expected: HandlerShape::Notification,
            })
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// The bulk mapping handed to [`HandlerRegistry::overwrite`].
///
/// Adding entries one by one is only possible here, before the table is
/// installed. An installed table is never mutated.
#[derive(Clone, Default, Debug)]
pub struct HandlerTable {
    entries: HashMap<TypeId, Vec<HandlerDescriptor>>,
}

impl HandlerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `H` as a request handler for `M`, named after its type.
    #[must_use]
    pub fn request<M, H>(self) -> Self
    where
        M: Request,
        H: RequestHandler<M> + FromProxy + 'static,
    {
        self.request_with::<M>(std::any::type_name::<H>(), request_factory_of::<M, H>())
    }

    /// Register a request handler for `M` built by an explicit factory.
    #[must_use]
    pub fn request_with<M: Request>(
        self,
        name: &'static str,
        factory: impl Fn(MediatorProxy) -> HandlerResult<Box<dyn RequestHandler<M>>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let factory: RequestFactory<M> = Arc::new(factory);
        self.insert(TypeId::of::<M>(), name, HandlerShape::Request, Arc::new(factory))
    }

    /// Register `H` as a notification handler for `M`, named after its type.
    #[must_use]
    pub fn notification<M, H>(self) -> Self
    where
        M: Notification,
        H: NotificationHandler<M> + FromProxy + 'static,
    {
        self.notification_with::<M>(
            std::any::type_name::<H>(),
            notification_factory_of::<M, H>(),
        )
    }

    /// Register a notification handler for `M` built by an explicit factory.
    #[must_use]
    pub fn notification_with<M: Notification>(
        self,
        name: &'static str,
        factory: impl Fn(MediatorProxy) -> HandlerResult<Box<dyn NotificationHandler<M>>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let factory: NotificationFactory<M> = Arc::new(factory);
        self.insert(
            TypeId::of::<M>(),
            name,
            HandlerShape::Notification,
            Arc::new(factory),
        )
    }

    /// Number of message types with at least one handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().filter(|list| !list.is_empty()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(
        mut self,
        message_type: TypeId,
        name: &'static str,
        shape: HandlerShape,
        factory: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        self.entries
            .entry(message_type)
            .or_default()
            .push(HandlerDescriptor {
                name,
                shape,
                factory,
            });
        self
    }

    fn handler_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    fn get(&self, message_type: &TypeId) -> Option<&[HandlerDescriptor]> {
        self.entries
            .get(message_type)
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }
}

/// Atomic, type-keyed routing table.
pub struct HandlerRegistry {
    table: ArcSwap<HandlerTable>,
}

impl HandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(HandlerTable::new()),
        }
    }

    /// Replace the whole table in one step.
    pub fn overwrite(&self, table: HandlerTable) {
        info!(
            message_types = table.len(),
            handlers = table.handler_count(),
            "Handler table overwritten"
        );
        self.table.store(Arc::new(table));
    }

    /// Install an empty table.
    pub fn clear(&self) {
        self.overwrite(HandlerTable::new());
    }

    /// The first-registered handler for the message's type.
    ///
    /// # Errors
    ///
    /// `DispatchError::NoHandlerRegistered` when nothing is registered.
    pub fn lookup_first<M: Any>(&self, message: &M) -> DispatchResult<HandlerDescriptor> {
        self.lookup_first_optional(message)
            .ok_or_else(not_found::<M>)
    }

    /// Every handler for the message's type, in registration order.
    ///
    /// # Errors
    ///
    /// `DispatchError::NoHandlerRegistered` when the list is absent or empty.
    pub fn lookup_all<M: Any>(&self, message: &M) -> DispatchResult<Vec<HandlerDescriptor>> {
        let table = self.table.load();
        table
            .get(&<M as Any>::type_id(message))
            .map(<[HandlerDescriptor]>::to_vec)
            .ok_or_else(not_found::<M>)
    }

    /// Like [`lookup_first`](Self::lookup_first), with absence as `None`.
    #[must_use]
    pub fn lookup_first_optional<M: Any>(&self, message: &M) -> Option<HandlerDescriptor> {
        let table = self.table.load();
        table
            .get(&<M as Any>::type_id(message))
            .and_then(|list| list.first().cloned())
    }

    /// Handler names registered for `M`, in order.
    #[must_use]
    pub fn handler_names<M: Any>(&self) -> Vec<&'static str> {
        let table = self.table.load();
        table
            .get(&TypeId::of::<M>())
            .map(|list| list.iter().map(HandlerDescriptor::name).collect())
            .unwrap_or_default()
    }

    /// Number of message types in the installed table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Arc<HandlerTable> {
        self.table.load_full()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found<M>() -> DispatchError {
    DispatchError::NoHandlerRegistered {
        message_type: message_type_name::<M>(),
    }
}
