//! Change notifications raised by the order and menu services.

use crate::events::{WsMessage, CHANNEL_ADMIN};
use crate::publisher::EventPublisher;
use std::sync::Arc;
use tracing::debug;

/// Publishes `orders_changed` / `menu_changed` to the admin channel.
///
/// Each call produces a fresh id, so two changes in quick succession are both
/// delivered. Publishing with no connected admins is a no-op.
#[derive(Clone)]
pub struct ChangeNotifier {
    publisher: Arc<dyn EventPublisher>,
}

impl ChangeNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn notify_orders_changed(&self) {
        self.notify(WsMessage::orders_changed()).await;
    }

    pub async fn notify_menu_changed(&self) {
        self.notify(WsMessage::menu_changed()).await;
    }

    async fn notify(&self, message: WsMessage) {
        let event = message.event_name();
        let receivers = self.publisher.publish(CHANNEL_ADMIN, message).await;
        debug!(event, receivers, "Change notification sent");
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("events_published", &self.publisher.events_published())
            .finish()
    }
}
