//! WebSocket push of change notifications.
//!
//! - [`transport`]: frame source/sink traits and their axum and channel
//!   implementations
//! - [`session`]: one connection's read/write loops, dedup and teardown
//! - [`handler`]: the axum upgrade endpoint

pub mod handler;
pub mod session;
pub mod transport;

pub use handler::{channels_for, ws_handler};
pub use session::{CloseReason, ConnectionSession, SessionConfig, SessionState};
pub use transport::{
    channel_transport, ChannelPeer, ChannelSink, ChannelSource, Frame, FrameSink, FrameSource,
    TransportError,
};
