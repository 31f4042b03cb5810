//! # Handler Contracts
//!
//! The two shapes of business logic the dispatcher can run, and the factory
//! functions that build them from a [`MediatorProxy`].
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use ground_mediator::{FromProxy, MediatorProxy, RequestHandler};
//! use ground_types::{HandlerResult, Request};
//! use async_trait::async_trait;
//!
//! struct Ping(String);
//! impl Request for Ping { type Output = String; }
//!
//! struct EchoHandler { proxy: MediatorProxy }
//!
//! impl FromProxy for EchoHandler {
//!     fn from_proxy(proxy: MediatorProxy) -> HandlerResult<Self> { Ok(Self { proxy }) }
//! }
//!
//! #[async_trait]
//! impl RequestHandler<Ping> for EchoHandler {
//!     async fn handle(&self, request: &Ping) -> HandlerResult<String> {
//!         Ok(request.0.clone())
//!     }
//! }
//! ```

use crate::proxy::MediatorProxy;
use async_trait::async_trait;
use ground_types::{HandlerResult, Notification, Request};
use std::sync::Arc;

/// Typed input to typed result-or-error.
#[async_trait]
pub trait RequestHandler<M: Request>: Send + Sync {
    async fn handle(&self, request: &M) -> HandlerResult<M::Output>;
}

/// Typed input to success-or-error, for side effects.
#[async_trait]
pub trait NotificationHandler<M: Notification>: Send + Sync {
    async fn handle(&self, notification: &M) -> HandlerResult<()>;
}

/// Construction from exactly one capability proxy.
///
/// Implementing this is what makes a handler type registrable with
/// [`HandlerTable::request`](crate::HandlerTable::request) and
/// [`HandlerTable::notification`](crate::HandlerTable::notification).
pub trait FromProxy: Sized {
    fn from_proxy(proxy: MediatorProxy) -> HandlerResult<Self>;
}

/// Builds a request handler bound to a proxy.
pub type RequestFactory<M> =
    Arc<dyn Fn(MediatorProxy) -> HandlerResult<Box<dyn RequestHandler<M>>> + Send + Sync>;

/// Builds a notification handler bound to a proxy.
pub type NotificationFactory<M> =
    Arc<dyn Fn(MediatorProxy) -> HandlerResult<Box<dyn NotificationHandler<M>>> + Send + Sync>;

/// Factory building `H` through [`FromProxy`].
pub(crate) fn request_factory_of<M, H>(
) -> impl Fn(MediatorProxy) -> HandlerResult<Box<dyn RequestHandler<M>>> + Send + Sync + 'static
where
    M: Request,
    H: RequestHandler<M> + FromProxy + 'static,
{
    |proxy: MediatorProxy| -> HandlerResult<Box<dyn RequestHandler<M>>> {
        Ok(Box::new(H::from_proxy(proxy)?))
    }
}

pub(crate) fn notification_factory_of<M, H>(
) -> impl Fn(MediatorProxy) -> HandlerResult<Box<dyn NotificationHandler<M>>> + Send + Sync + 'static
where
    M: Notification,
    H: NotificationHandler<M> + FromProxy + 'static,
{
    |proxy: MediatorProxy| -> HandlerResult<Box<dyn NotificationHandler<M>>> {
        Ok(Box::new(H::from_proxy(proxy)?))
    }
}
