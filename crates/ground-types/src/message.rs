//! # Message Contracts
//!
//! A message's exact type is its routing key. Requests expect one typed
//! result per handler invocation; notifications only acknowledge success.

/// A call-and-get-a-result message.
///
/// ```rust,ignore
/// struct Ping(String);
///
/// impl Request for Ping {
///     type Output = String;
/// }
/// ```
pub trait Request: Send + Sync + 'static {
    /// Value produced by a successful handler.
    type Output: Send + 'static;
}

/// A fire-and-forget message whose handlers run after the dispatching
/// session has released its resources.
pub trait Notification: Send + Sync + 'static {}

/// Human-readable name of a message type, used in errors and log fields.
#[must_use]
pub fn message_type_name<M: ?Sized>() -> &'static str {
    std::any::type_name::<M>()
}
