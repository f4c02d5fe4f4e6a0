//! WebSocket upgrade handler.
//!
//! Every client receives the global channel. Clients presenting the admin
//! token (header or `?token=`) additionally receive the admin channel.

use crate::router::AppState;
use crate::ws::session::{CloseReason, ConnectionSession};
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    http::{HeaderMap, Uri},
    response::Response,
};
use futures::StreamExt;
use shared_bus::{CHANNEL_ADMIN, CHANNEL_GLOBAL};
use tracing::debug;

/// Channels a client is subscribed to.
pub fn channels_for(is_admin: bool) -> Vec<&'static str> {
    if is_admin {
        vec![CHANNEL_GLOBAL, CHANNEL_ADMIN]
    } else {
        vec![CHANNEL_GLOBAL]
    }
}

/// `GET /ws`
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Response {
    let is_admin = state.auth.check(&headers, &uri);
    let channels = channels_for(is_admin);
    debug!(admin = is_admin, "Upgrading WebSocket connection");

    ws.on_upgrade(move |socket| async move {
        serve_socket(socket, state, channels).await;
    })
}

async fn serve_socket(socket: WebSocket, state: AppState, channels: Vec<&'static str>) -> CloseReason {
    let (sink, source) = socket.split();
    let session = ConnectionSession::new(
        state.bus.clone(),
        state.session.clone(),
        &state.shutdown,
    );
    session.run(&channels, source, sink).await
}
