//! Test node: the runtime's service container behind the gateway router.

use std::sync::Arc;
use std::time::Duration;

use api_gateway::ws::{channel_transport, channels_for, ChannelPeer, CloseReason, SessionState};
use api_gateway::{ApiGatewayService, ConnectionSession, SessionConfig};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use node_runtime::container::{NodeConfig, ServiceContainer};
use shared_bus::WsMessage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

/// Admin token configured on every harness node.
pub const ADMIN_TOKEN: &str = "integration-admin-token";

/// One node wired the way `node-runtime` wires it.
pub struct TestNode {
    pub container: Arc<ServiceContainer>,
    pub router: Router,
    pub shutdown: CancellationToken,
}

impl TestNode {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Start from the default config with the admin token set, then apply `adjust`.
    pub fn with_config(adjust: impl FnOnce(&mut NodeConfig)) -> Self {
        let mut config = NodeConfig::default();
        config.gateway.admin.token = Some(ADMIN_TOKEN.to_string());
        adjust(&mut config);

        let shutdown = CancellationToken::new();
        let container = Arc::new(ServiceContainer::new(config).expect("container"));
        let gateway = ApiGatewayService::new(
            container.config.gateway.clone(),
            Arc::clone(&container.bus),
            container.services(),
            shutdown.clone(),
        )
        .expect("gateway");

        Self {
            router: gateway.router(),
            container,
            shutdown,
        }
    }

    /// Send one request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Connect an in-process WebSocket client.
    pub async fn connect(&self, admin: bool) -> TestClient {
        let session = ConnectionSession::new(
            Arc::clone(&self.container.bus),
            SessionConfig::from(&self.container.config.gateway.websocket),
            &self.shutdown,
        );
        let mut states = session.watch_state();
        let (peer, source, sink) = channel_transport(8);
        let channels = channels_for(admin);
        let task = tokio::spawn(async move { session.run(&channels, source, sink).await });

        tokio::time::timeout(
            Duration::from_secs(2),
            states.wait_for(|s| *s == SessionState::Active),
        )
        .await
        .expect("session did not become active")
        .expect("state channel closed");

        TestClient { peer, task }
    }

    /// First visible product of the demo menu.
    pub async fn some_product(&self) -> Uuid {
        let menus = self.container.menu.get_menu(false).await.expect("menu");
        menus
            .iter()
            .flat_map(|m| &m.groups)
            .flat_map(|g| &g.products)
            .map(|p| p.id)
            .next()
            .expect("demo menu has products")
    }
}

impl Default for TestNode {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket client attached to a [`TestNode`].
pub struct TestClient {
    pub peer: ChannelPeer,
    pub task: JoinHandle<CloseReason>,
}

impl TestClient {
    /// Next message written to this client.
    pub async fn next(&mut self) -> WsMessage {
        tokio::time::timeout(Duration::from_secs(2), self.peer.outbound.recv())
            .await
            .expect("no message written")
            .expect("sink closed")
    }

    /// Assert nothing is written for a short while.
    pub async fn assert_silent(&mut self) {
        let extra = tokio::time::timeout(Duration::from_millis(150), self.peer.outbound.recv()).await;
        assert!(extra.is_err(), "unexpected write: {extra:?}");
    }
}

/// `POST /api/orders` for one unit of each product, from `ip`.
pub fn order_request(ip: &str, products: &[Uuid]) -> Request<Body> {
    let items: Vec<_> = products
        .iter()
        .map(|id| serde_json::json!({"id": id, "amount": 1}))
        .collect();
    let body = serde_json::json!({
        "id": Uuid::new_v4(),
        "name": "Table 7",
        "comment": "no onions",
        "items": items,
    });
    Request::post("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Admin request with the bearer token and an optional JSON body.
pub fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

/// Read a JSON response body.
pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Assert `response` has `status`, printing the body otherwise.
pub async fn expect_status(response: Response, status: StatusCode) -> Response {
    if response.status() == status {
        return response;
    }
    let actual = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    panic!(
        "expected {status}, got {actual}: {}",
        String::from_utf8_lossy(&bytes)
    );
}
