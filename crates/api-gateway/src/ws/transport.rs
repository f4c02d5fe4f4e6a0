//! Frame transport seen by a connection session.
//!
//! The session only needs "give me the next inbound frame" and "write this
//! message as JSON". Deadlines are applied by the session around each call.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use shared_bus::WsMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Inbound frame, reduced to what the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Protocol-level ping or pong. Counts as activity only.
    Control,
    /// Close frame from the client.
    Close,
}

impl Frame {
    /// Whether this is an application-level `ping` request.
    pub fn is_ping(&self) -> bool {
        match self {
            Self::Text(text) => text == "ping",
            Self::Binary(data) => data == b"ping",
            Self::Control | Self::Close => false,
        }
    }
}

/// Transport failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone
    #[error("connection closed")]
    Closed,
    /// Socket-level failure
    #[error("socket error: {0}")]
    Socket(String),
    /// Message could not be serialized
    #[error("encode error: {0}")]
    Encode(String),
}

/// Read half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next inbound frame. `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Serialize `message` and write it as one text frame.
    async fn send_json(&mut self, message: &WsMessage) -> Result<(), TransportError>;

    /// Best-effort close of the write side.
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl FrameSource for SplitStream<WebSocket> {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = match self.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(TransportError::Socket(e.to_string()))),
        };
        Some(Ok(match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(data) => Frame::Binary(data),
            Message::Ping(_) | Message::Pong(_) => Frame::Control,
            Message::Close(_) => Frame::Close,
        }))
    }
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_json(&mut self, message: &WsMessage) -> Result<(), TransportError> {
        let json =
            serde_json::to_string(message).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.send(Message::Text(json))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::close(self)
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }
}

/// Read half backed by a channel. Dropping the sender ends the stream.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Frame, TransportError>>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await
    }
}

/// Write half backed by a channel. Writes can be made to fail on demand.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WsMessage>,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_json(&mut self, message: &WsMessage) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Socket("injected write failure".into()));
        }
        self.tx
            .send(message.clone())
            .map_err(|_| TransportError::Closed)
    }
}

/// Client side of an in-process connection.
pub struct ChannelPeer {
    /// Frames sent to the session
    pub inbound: mpsc::Sender<Result<Frame, TransportError>>,
    /// Messages the session wrote
    pub outbound: mpsc::UnboundedReceiver<WsMessage>,
    /// When set, every session write fails
    pub fail_writes: Arc<AtomicBool>,
}

/// In-process connection: the peer drives one end, a session the other.
pub fn channel_transport(capacity: usize) -> (ChannelPeer, ChannelSource, ChannelSink) {
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let fail_writes = Arc::new(AtomicBool::new(false));
    (
        ChannelPeer {
            inbound: in_tx,
            outbound: out_rx,
            fail_writes: Arc::clone(&fail_writes),
        },
        ChannelSource { rx: in_rx },
        ChannelSink {
            tx: out_tx,
            fail_writes,
        },
    )
}
