//! # Subscribers
//!
//! The receiving side of the bus: the [`Subscriber`] capability and the
//! [`SubscriptionHandle`] returned on registration.

use crate::events::WsMessage;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Receives messages published to a channel.
///
/// Implementations should return quickly. A delivery that awaits (for example
/// on a full bounded queue) delays only the `publish` call that triggered it,
/// never the deliveries to other subscribers.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Handle one message.
    async fn deliver(&self, message: WsMessage);
}

/// Adapter turning a synchronous closure into a [`Subscriber`].
pub struct FnSubscriber<F>(F);

impl<F> FnSubscriber<F>
where
    F: Fn(WsMessage) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

#[async_trait]
impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(WsMessage) + Send + Sync,
{
    async fn deliver(&self, message: WsMessage) {
        (self.0)(message);
    }
}

/// Opaque token identifying one registration on one bus.
///
/// Cloning is cheap. Passing a handle to `unsubscribe` more than once, or to a
/// different bus, has no effect.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    bus_id: u64,
    channel: Arc<str>,
    id: u64,
}

impl SubscriptionHandle {
    pub(crate) fn new(bus_id: u64, channel: Arc<str>, id: u64) -> Self {
        Self {
            bus_id,
            channel,
            id,
        }
    }

    /// Channel this registration listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Registration id, unique within its bus.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn bus_id(&self) -> u64 {
        self.bus_id
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({}#{}@bus{})", self.channel, self.id, self.bus_id)
    }
}
