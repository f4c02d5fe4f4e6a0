//! Order intake limits, exercised through the full router.

use axum::http::{header, StatusCode};

use super::harness::{expect_status, order_request, TestNode};

#[tokio::test]
async fn test_sixth_order_per_minute_is_rejected() {
    let node = TestNode::new();
    let product = node.some_product().await;

    for _ in 0..5 {
        let response = node.send(order_request("192.0.2.10", &[product])).await;
        expect_status(response, StatusCode::CREATED).await;
    }

    let limited = node.send(order_request("192.0.2.10", &[product])).await;
    let limited = expect_status(limited, StatusCode::TOO_MANY_REQUESTS).await;
    let retry_after: u64 = limited.headers()[header::RETRY_AFTER]
        .to_str()
        .expect("ascii header")
        .parse()
        .expect("seconds");
    assert!((1..=60).contains(&retry_after));

    // Limits are per client address
    let other = node.send(order_request("192.0.2.11", &[product])).await;
    expect_status(other, StatusCode::CREATED).await;
}

#[tokio::test]
async fn test_global_cap_applies_across_clients() {
    let node = TestNode::with_config(|config| {
        config.gateway.rate_limit.orders_per_second = 3;
    });
    let product = node.some_product().await;

    for i in 0..3 {
        let response = node.send(order_request(&format!("192.0.2.{}", 20 + i), &[product])).await;
        expect_status(response, StatusCode::CREATED).await;
    }
    let capped = node.send(order_request("192.0.2.30", &[product])).await;
    expect_status(capped, StatusCode::TOO_MANY_REQUESTS).await;
}

#[tokio::test]
async fn test_rejected_orders_are_not_stored() {
    let node = TestNode::new();
    let product = node.some_product().await;

    for _ in 0..7 {
        node.send(order_request("192.0.2.40", &[product])).await;
    }
    let page = node.container.orders.list(0, 100).await.expect("list");
    assert_eq!(page.total, 5);
}
