//! # Shared Bus - Notification Bus for Live Admin Updates
//!
//! Decouples writers (order and menu services) from WebSocket connections.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ OrderService │                    │ ConnectionSession│
//! │  MenuService │    publish()       │  (one per socket)│
//! │              │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐           │
//!                  │ Notification │           │
//!                  │     Bus      │ ──────────┘
//!                  └──────────────┘  subscribe(channel)
//! ```
//!
//! ## Guarantees
//!
//! - Delivery is attempted to every subscriber of a channel before
//!   `publish` returns.
//! - A subscriber that panics is isolated: the panic is logged and the
//!   remaining subscribers still receive the message.
//! - `unsubscribe` is idempotent and safe to call from inside a delivery.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

use std::time::Duration;

pub mod events;
pub mod notifier;
pub mod publisher;
pub mod subscriber;
pub mod ttl_cache;

// Re-export main types
pub use events::{WsMessage, CHANNEL_ADMIN, CHANNEL_GLOBAL};
pub use notifier::ChangeNotifier;
pub use publisher::{EventPublisher, NotificationBus};
pub use subscriber::{FnSubscriber, Subscriber, SubscriptionHandle};
pub use ttl_cache::{ExpiringMap, Sweeper};

/// Outbound queue capacity of one connection session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// How long a delivered message id suppresses duplicates.
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(60);

/// How often expiring maps sweep out stale entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
