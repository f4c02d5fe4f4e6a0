//! # Change Notification Flows
//!
//! HTTP writes go through the services, the services publish on the bus and
//! connected admin sessions receive the event:
//!
//! ```text
//! POST /api/orders ──▶ OrderService ──▶ ChangeNotifier ──▶ NotificationBus
//!                                                              │ admin
//!                                                              ▼
//!                                                   ConnectionSession ──▶ client
//! ```

use std::sync::Arc;

use axum::http::StatusCode;
use shared_bus::{EventPublisher, WsMessage, CHANNEL_ADMIN};

use super::harness::{admin_request, expect_status, json_body, order_request, TestNode};

#[tokio::test]
async fn test_new_order_reaches_admin_sessions_only() {
    let node = TestNode::new();
    let product = node.some_product().await;
    let mut admin = node.connect(true).await;
    let mut second_admin = node.connect(true).await;
    let mut guest = node.connect(false).await;

    let response = node.send(order_request("198.51.100.1", &[product])).await;
    let order = json_body(expect_status(response, StatusCode::CREATED).await).await;
    assert_eq!(order["client_name"], "Table 7");
    assert_eq!(order["status"], "open");

    let first = admin.next().await;
    assert_eq!(first.event_name(), "orders_changed");
    // Both admins receive the same event instance
    assert_eq!(second_admin.next().await, first);
    guest.assert_silent().await;
}

#[tokio::test]
async fn test_order_lifecycle_notifications() {
    let node = TestNode::new();
    let product = node.some_product().await;
    let mut admin = node.connect(true).await;

    let created = json_body(node.send(order_request("198.51.100.2", &[product])).await).await;
    let id = created["id"].as_str().expect("order id").to_string();
    assert_eq!(admin.next().await.event_name(), "orders_changed");

    // Opening an order is silent
    let seen = node
        .send(admin_request("POST", &format!("/api/admin/orders/{id}/seen"), None))
        .await;
    expect_status(seen, StatusCode::NO_CONTENT).await;
    admin.assert_silent().await;

    let finished = node
        .send(admin_request(
            "PUT",
            &format!("/api/admin/orders/{id}/status"),
            Some(serde_json::json!({"status": "finished"})),
        ))
        .await;
    expect_status(finished, StatusCode::NO_CONTENT).await;
    assert_eq!(admin.next().await.event_name(), "orders_changed");

    let fetched = json_body(
        node.send(admin_request("GET", &format!("/api/admin/orders/{id}"), None))
            .await,
    )
    .await;
    assert_eq!(fetched["status"], "finished");
    assert_eq!(fetched["seen"], true);

    let deleted = node
        .send(admin_request("DELETE", &format!("/api/admin/orders/{id}"), None))
        .await;
    expect_status(deleted, StatusCode::NO_CONTENT).await;
    assert_eq!(admin.next().await.event_name(), "orders_changed");

    let missing = node
        .send(admin_request("GET", &format!("/api/admin/orders/{id}"), None))
        .await;
    expect_status(missing, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn test_menu_edits_publish_menu_changed() {
    let node = TestNode::new();
    let product = node.some_product().await;
    let mut admin = node.connect(true).await;

    let menus = json_body(node.send(admin_request("GET", "/api/admin/menu", None)).await).await;
    let group_id = menus[0]["groups"][0]["id"].clone();

    let updated = node
        .send(admin_request(
            "PUT",
            &format!("/api/admin/products/{product}"),
            Some(serde_json::json!({
                "group_id": group_id,
                "name": "Samosa (3 pcs)",
                "price": 5.5,
                "hidden": false,
            })),
        ))
        .await;
    let updated = json_body(expect_status(updated, StatusCode::OK).await).await;
    assert_eq!(updated["name"], "Samosa (3 pcs)");
    assert_eq!(admin.next().await.event_name(), "menu_changed");

    let deleted = node
        .send(admin_request("DELETE", &format!("/api/admin/products/{product}"), None))
        .await;
    expect_status(deleted, StatusCode::NO_CONTENT).await;
    assert_eq!(admin.next().await.event_name(), "menu_changed");

    // A deleted product can no longer be ordered
    let rejected = node.send(order_request("198.51.100.3", &[product])).await;
    expect_status(rejected, StatusCode::BAD_REQUEST).await;
    admin.assert_silent().await;
}

#[tokio::test]
async fn test_group_management_publishes_menu_changed() {
    let node = TestNode::new();
    let mut admin = node.connect(true).await;

    let menus = json_body(node.send(admin_request("GET", "/api/admin/menu", None)).await).await;
    let menu_id = menus[0]["id"].clone();
    let group_id = uuid::Uuid::new_v4();

    let created = node
        .send(admin_request(
            "POST",
            "/api/admin/groups",
            Some(serde_json::json!({"id": group_id, "menu_id": menu_id, "name": "Chaat"})),
        ))
        .await;
    expect_status(created, StatusCode::CREATED).await;
    assert_eq!(admin.next().await.event_name(), "menu_changed");

    let renamed = node
        .send(admin_request(
            "PUT",
            &format!("/api/admin/groups/{group_id}"),
            Some(serde_json::json!({"name": "Street food"})),
        ))
        .await;
    expect_status(renamed, StatusCode::NO_CONTENT).await;
    assert_eq!(admin.next().await.event_name(), "menu_changed");

    let deleted = node
        .send(admin_request("DELETE", &format!("/api/admin/groups/{group_id}"), None))
        .await;
    expect_status(deleted, StatusCode::NO_CONTENT).await;
    assert_eq!(admin.next().await.event_name(), "menu_changed");

    // Pages and site parameters are not part of the menu
    let page = node
        .send(admin_request(
            "POST",
            "/api/admin/pages",
            Some(serde_json::json!({"id": "about", "title": "About us"})),
        ))
        .await;
    expect_status(page, StatusCode::CREATED).await;
    let header = node
        .send(admin_request(
            "PUT",
            "/api/admin/params/header",
            Some(serde_json::json!({"text": "Closed on Monday"})),
        ))
        .await;
    expect_status(header, StatusCode::OK).await;
    admin.assert_silent().await;

    let params = node
        .send(
            axum::http::Request::get("/api/params")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(json_body(params).await["header_text"], "Closed on Monday");
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_starve_sessions() {
    let node = TestNode::new();
    let product = node.some_product().await;
    let mut admin = node.connect(true).await;
    let _exporter = node
        .container
        .bus
        .subscribe_fn(CHANNEL_ADMIN, |_| panic!("dashboard exporter crashed"));

    let response = node.send(order_request("198.51.100.4", &[product])).await;
    expect_status(response, StatusCode::CREATED).await;

    assert_eq!(admin.next().await.event_name(), "orders_changed");
    assert_eq!(node.container.bus.deliveries_failed(), 1);
}

#[tokio::test]
async fn test_ping_pong_over_node_session() {
    let node = TestNode::new();
    let mut guest = node.connect(false).await;

    guest
        .peer
        .inbound
        .send(Ok(api_gateway::ws::Frame::Text("ping".into())))
        .await
        .expect("session reading");
    assert_eq!(guest.next().await, WsMessage::Pong);
}

#[tokio::test]
async fn test_shutdown_closes_sessions_and_releases_subscriptions() {
    let node = TestNode::new();
    let admin = node.connect(true).await;
    let guest = node.connect(false).await;
    assert_eq!(node.container.bus.total_subscribers(), 3);

    node.shutdown.cancel();
    assert_eq!(
        admin.task.await.expect("admin session"),
        api_gateway::CloseReason::Shutdown
    );
    assert_eq!(
        guest.task.await.expect("guest session"),
        api_gateway::CloseReason::Shutdown
    );
    assert_eq!(node.container.bus.total_subscribers(), 0);

    let bus: Arc<dyn EventPublisher> = node.container.bus.clone();
    assert_eq!(bus.publish(CHANNEL_ADMIN, WsMessage::orders_changed()).await, 0);
}
