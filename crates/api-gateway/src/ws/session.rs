//! # Connection Session
//!
//! Per-socket state and the two cooperating loops that serve one WebSocket.
//!
//! ## Lifecycle
//!
//! ```text
//! Connecting ──run()──▶ Active ──read ends / write fails / shutdown──▶ Closing ──▶ Closed
//! ```
//!
//! - **Read loop** (the `run` future itself): reads frames under a rolling
//!   read timeout and answers application-level `ping` with `pong`.
//! - **Write loop** (spawned task): drains the bounded outbound queue, drops
//!   message ids already delivered within the dedup TTL, and writes each
//!   message under a write timeout.
//!
//! Both loops share one cancellation token, a child of the server shutdown
//! token. Whichever side stops first cancels it, and teardown runs exactly
//! once: subscriptions are released, the queue closes, the dedup sweeper
//! stops and the write task is awaited.

use crate::domain::config::WebSocketConfig;
use crate::domain::correlation::ConnectionId;
use crate::ws::transport::{Frame, FrameSink, FrameSource};
use async_trait::async_trait;
use shared_bus::{ExpiringMap, NotificationBus, Subscriber, SubscriptionHandle, Sweeper, WsMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Session timing and sizing.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub queue_capacity: usize,
    pub dedup_ttl: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&WebSocketConfig::default())
    }
}

impl From<&WebSocketConfig> for SessionConfig {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity.max(1),
            dedup_ttl: config.dedup_ttl,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            sweep_interval: config.sweep_interval,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame or the stream ended
    ClientClosed,
    /// Nothing received within the read timeout
    ReadTimeout,
    /// Reading from the socket failed
    Transport(String),
    /// Writing to the socket failed or timed out
    WriteFailed,
    /// Server is shutting down
    Shutdown,
}

/// Bus subscriber feeding a session's outbound queue.
struct QueueSubscriber {
    tx: mpsc::Sender<WsMessage>,
}

#[async_trait]
impl Subscriber for QueueSubscriber {
    async fn deliver(&self, message: WsMessage) {
        // Closed queue: session already torn down
        let _ = self.tx.send(message).await;
    }
}

/// One WebSocket connection.
pub struct ConnectionSession {
    id: ConnectionId,
    bus: Arc<NotificationBus>,
    config: SessionConfig,
    cancel: CancellationToken,
    tx: Option<mpsc::Sender<WsMessage>>,
    rx: Option<mpsc::Receiver<WsMessage>>,
    handles: Vec<SubscriptionHandle>,
    dedup: ExpiringMap<String, ()>,
    sweeper: Option<Sweeper>,
    writer: Option<JoinHandle<()>>,
    write_failed: Arc<AtomicBool>,
    state: watch::Sender<SessionState>,
    torn_down: bool,
}

impl ConnectionSession {
    /// Create a session in the `Connecting` state. It stops on its own
    /// triggers or when `shutdown` is cancelled.
    pub fn new(
        bus: Arc<NotificationBus>,
        config: SessionConfig,
        shutdown: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            id: ConnectionId::new(),
            bus,
            config,
            cancel: shutdown.child_token(),
            tx: Some(tx),
            rx: Some(rx),
            handles: Vec::new(),
            dedup: ExpiringMap::new(),
            sweeper: None,
            writer: None,
            write_failed: Arc::new(AtomicBool::new(false)),
            state,
            torn_down: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Serve the connection until it ends, then tear down.
    ///
    /// Subscribes to every channel in `channels` first, so a message
    /// published once `run` has started is delivered.
    pub async fn run<R, W>(mut self, channels: &[&str], mut source: R, sink: W) -> CloseReason
    where
        R: FrameSource,
        W: FrameSink + 'static,
    {
        let (Some(tx), Some(rx)) = (self.tx.clone(), self.rx.take()) else {
            return CloseReason::Shutdown;
        };

        for channel in channels {
            let subscriber = Arc::new(QueueSubscriber { tx: tx.clone() });
            self.handles.push(self.bus.subscribe(channel, subscriber));
        }
        drop(tx);

        self.sweeper = Some(self.dedup.spawn_sweeper(self.config.sweep_interval));
        self.writer = Some(tokio::spawn(write_loop(
            WriteLoop {
                id: self.id,
                dedup: self.dedup.clone(),
                dedup_ttl: self.config.dedup_ttl,
                write_timeout: self.config.write_timeout,
                cancel: self.cancel.clone(),
                write_failed: Arc::clone(&self.write_failed),
            },
            sink,
            rx,
        )));

        self.set_state(SessionState::Active);
        info!(connection_id = %self.id, channels = ?channels, "WebSocket session started");

        let reason = self.read_loop(&mut source).await;

        self.teardown().await;
        info!(connection_id = %self.id, reason = ?reason, "WebSocket session closed");
        reason
    }

    async fn read_loop<R: FrameSource>(&self, source: &mut R) -> CloseReason {
        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancel_reason(),
                read = timeout(self.config.read_timeout, source.next_frame()) => read,
            };

            let frame = match read {
                Err(_) => return CloseReason::ReadTimeout,
                Ok(None) => return CloseReason::ClientClosed,
                Ok(Some(Err(e))) => {
                    debug!(connection_id = %self.id, error = %e, "Read failed");
                    return CloseReason::Transport(e.to_string());
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Frame::Close => return CloseReason::ClientClosed,
                frame if frame.is_ping() => {
                    if !self.enqueue(WsMessage::Pong).await {
                        return self.cancel_reason();
                    }
                }
                other => trace!(connection_id = %self.id, frame = ?other, "Ignoring frame"),
            }
        }
    }

    /// Queue a message for this connection only. Returns `false` if the
    /// session is shutting down.
    async fn enqueue(&self, message: WsMessage) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = tx.send(message) => sent.is_ok(),
        }
    }

    fn cancel_reason(&self) -> CloseReason {
        if self.write_failed.load(Ordering::SeqCst) {
            CloseReason::WriteFailed
        } else {
            CloseReason::Shutdown
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Synchronous part of teardown. Safe to call more than once.
    fn release(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.set_state(SessionState::Closing);

        for handle in self.handles.drain(..) {
            self.bus.unsubscribe(&handle);
        }
        self.cancel.cancel();
        self.tx = None;
        self.rx = None;
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
    }

    async fn teardown(&mut self) {
        self.release();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                warn!(connection_id = %self.id, error = %e, "Write task ended abnormally");
            }
        }
        self.set_state(SessionState::Closed);
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if !self.torn_down {
            debug!(connection_id = %self.id, "Session dropped while running");
        }
        self.release();
        // The write task observes the cancelled token and exits on its own
        self.writer.take();
        self.set_state(SessionState::Closed);
    }
}

struct WriteLoop {
    id: ConnectionId,
    dedup: ExpiringMap<String, ()>,
    dedup_ttl: Duration,
    write_timeout: Duration,
    cancel: CancellationToken,
    write_failed: Arc<AtomicBool>,
}

async fn write_loop<W: FrameSink>(ctx: WriteLoop, mut sink: W, mut rx: mpsc::Receiver<WsMessage>) {
    loop {
        let message = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if let Some(id) = message.message_id() {
            if ctx.dedup.contains(id) {
                trace!(connection_id = %ctx.id, message_id = id, "Skipping duplicate message");
                continue;
            }
            ctx.dedup.insert(id.to_string(), (), ctx.dedup_ttl);
        }

        let failure = match timeout(ctx.write_timeout, sink.send_json(&message)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("write timed out after {:?}", ctx.write_timeout)),
        };
        if let Some(error) = failure {
            warn!(
                connection_id = %ctx.id,
                event = message.event_name(),
                error = %error,
                "WebSocket write failed"
            );
            ctx.write_failed.store(true, Ordering::SeqCst);
            ctx.cancel.cancel();
            break;
        }
    }

    drop(rx);
    let _ = timeout(ctx.write_timeout, sink.close()).await;
}
