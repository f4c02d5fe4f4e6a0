//! # Notification Bus
//!
//! Channel-scoped publish/subscribe with panic-isolated fan-out.

use crate::events::WsMessage;
use crate::subscriber::{FnSubscriber, Subscriber, SubscriptionHandle};
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of unique bus ids, so handles from one bus are inert on another.
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Trait for publishing messages to the bus.
///
/// This is the only capability writers need.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a message to every subscriber of `channel`.
    ///
    /// # Returns
    ///
    /// The number of subscribers that accepted the message without panicking.
    async fn publish(&self, channel: &str, message: WsMessage) -> usize;

    /// Get the total number of messages published.
    fn events_published(&self) -> u64;
}

type ChannelSubscribers = HashMap<u64, Arc<dyn Subscriber>>;

/// In-memory notification bus.
///
/// The subscriber map is guarded by a read/write lock that is held only while
/// the map is mutated or snapshotted, never while a subscriber runs. This is
/// what makes `unsubscribe` safe to call from inside a delivery.
pub struct NotificationBus {
    /// Unique id of this bus instance.
    bus_id: u64,

    /// Channel name → registrations.
    channels: RwLock<HashMap<Arc<str>, ChannelSubscribers>>,

    /// Next registration id.
    next_subscription_id: AtomicU64,

    /// Total messages published.
    events_published: AtomicU64,

    /// Deliveries lost to a panicking subscriber.
    deliveries_failed: AtomicU64,
}

impl NotificationBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus_id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            channels: RwLock::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
        }
    }

    /// Register `subscriber` for every later message on `channel`.
    pub fn subscribe(&self, channel: &str, subscriber: Arc<dyn Subscriber>) -> SubscriptionHandle {
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);

        let mut channels = self.channels.write();
        let key = match channels.get_key_value(channel) {
            Some((key, _)) => Arc::clone(key),
            None => Arc::from(channel),
        };
        channels
            .entry(Arc::clone(&key))
            .or_default()
            .insert(id, subscriber);
        drop(channels);

        debug!(channel = channel, subscription_id = id, "New subscription created");

        SubscriptionHandle::new(self.bus_id, key, id)
    }

    /// Register a synchronous closure for every later message on `channel`.
    pub fn subscribe_fn<F>(&self, channel: &str, callback: F) -> SubscriptionHandle
    where
        F: Fn(WsMessage) + Send + Sync + 'static,
    {
        self.subscribe(channel, Arc::new(FnSubscriber::new(callback)))
    }

    /// Remove a registration.
    ///
    /// Returns `true` if the handle was registered on this bus. Unknown,
    /// already removed and foreign handles are ignored.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        if handle.bus_id() != self.bus_id {
            return false;
        }

        let mut channels = self.channels.write();
        let Some(subscribers) = channels.get_mut(handle.channel()) else {
            return false;
        };
        let removed = subscribers.remove(&handle.id()).is_some();
        if subscribers.is_empty() {
            channels.remove(handle.channel());
        }
        drop(channels);

        if removed {
            debug!(
                channel = handle.channel(),
                subscription_id = handle.id(),
                "Subscription removed"
            );
        }
        removed
    }

    /// Number of registrations on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.read().get(channel).map_or(0, HashMap::len)
    }

    /// Number of registrations across all channels.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.channels.read().values().map(HashMap::len).sum()
    }

    /// Deliveries lost because a subscriber panicked.
    #[must_use]
    pub fn deliveries_failed(&self) -> u64 {
        self.deliveries_failed.load(Ordering::Relaxed)
    }

    fn snapshot(&self, channel: &str) -> Vec<(u64, Arc<dyn Subscriber>)> {
        self.channels
            .read()
            .get(channel)
            .map(|subs| subs.iter().map(|(id, s)| (*id, Arc::clone(s))).collect())
            .unwrap_or_default()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for NotificationBus {
    async fn publish(&self, channel: &str, message: WsMessage) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.snapshot(channel);
        if subscribers.is_empty() {
            debug!(channel = channel, event = message.event_name(), "No subscribers for event");
            return 0;
        }

        let deliveries = subscribers.into_iter().map(|(id, subscriber)| {
            let message = message.clone();
            async move {
                AssertUnwindSafe(subscriber.deliver(message))
                    .catch_unwind()
                    .await
                    .map_err(|panic| (id, panic))
            }
        });

        let mut delivered = 0;
        for outcome in join_all(deliveries).await {
            match outcome {
                Ok(()) => delivered += 1,
                Err((id, panic)) => {
                    self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = channel,
                        subscription_id = id,
                        event = message.event_name(),
                        panic = %panic_message(panic.as_ref()),
                        "Subscriber panicked during delivery"
                    );
                }
            }
        }

        debug!(
            channel = channel,
            event = message.event_name(),
            receivers = delivered,
            "Event published"
        );
        delivered
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
