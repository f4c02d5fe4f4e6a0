//! HTTP routes.
//!
//! ```text
//! GET    /health
//! GET    /api/menu
//! POST   /api/orders                         rate limited
//! GET    /api/pages
//! GET    /api/pages/:id
//! GET    /api/params
//! GET    /api/settings/:key                  menu | background
//! GET    /ws                                 WebSocket upgrade
//!
//! /api/admin (bearer token)
//! GET    /orders?offset=&limit=
//! GET    /orders/:id
//! DELETE /orders/:id
//! PUT    /orders/:id/status
//! POST   /orders/:id/seen
//! GET    /menu                               hidden products included
//! PUT    /products/:id
//! DELETE /products/:id
//! POST   /groups
//! PUT    /groups/:id                         rename
//! DELETE /groups/:id                         with its products
//! PUT    /menus/:id/group-order
//! PUT    /groups/:id/product-order
//! POST   /pages
//! PUT    /pages/:id
//! DELETE /pages/:id
//! PUT    /params/header
//! PUT    /settings/:key
//! ```

use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::menu::{GroupInput, MenuService, ProductInput};
use crate::domain::orders::{OrderService, MAX_PAGE_SIZE};
use crate::domain::pages::{Page, PageService};
use crate::domain::params::{HeaderInput, ParamsService, SiteParams};
use crate::middleware::{create_cors_layer, AdminAuth, AuthLayer, RateLimitLayer, RateLimiter, RateRule, TracingLayer};
use crate::ws::{ws_handler, SessionConfig};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use shared_bus::NotificationBus;
use shared_types::{Menu, NewOrderRequest, Order, OrderStatus, Paginated, Product, ProductGroup};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

/// Operation name of order creation in rate-limit keys.
pub const OP_CREATE_ORDER: &str = "create_order";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub menu: MenuService,
    pub pages: PageService,
    pub params: ParamsService,
    pub bus: Arc<NotificationBus>,
    pub auth: AdminAuth,
    pub session: SessionConfig,
    /// Server shutdown; WebSocket sessions are scoped to it.
    pub shutdown: CancellationToken,
}

/// Build the full application router.
pub fn build_router(state: AppState, config: &GatewayConfig, limiter: Arc<RateLimiter>) -> Router {
    let mut create_order_route = post(create_order);
    if config.rate_limit.enabled {
        // Outermost runs first: per-IP rejections never consume global tokens
        create_order_route = create_order_route
            .layer::<_, Infallible>(RateLimitLayer::new(
                Arc::clone(&limiter),
                RateRule::global_second(OP_CREATE_ORDER, config.rate_limit.orders_per_second),
            ))
            .layer::<_, Infallible>(RateLimitLayer::new(
                limiter,
                RateRule::per_ip_minute(OP_CREATE_ORDER, config.rate_limit.create_order_per_minute),
            ));
    }

    let admin = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/status", put(set_order_status))
        .route("/orders/:id/seen", post(mark_order_seen))
        .route("/menu", get(admin_menu))
        .route("/products/:id", put(upsert_product).delete(delete_product))
        .route("/groups", post(add_group))
        .route("/groups/:id", put(rename_group).delete(delete_group))
        .route("/menus/:id/group-order", put(set_group_order))
        .route("/groups/:id/product-order", put(set_product_order))
        .route("/pages", post(create_page))
        .route("/pages/:id", put(update_page).delete(delete_page))
        .route("/params/header", put(set_header))
        .route("/settings/:key", put(upsert_setting))
        .route_layer(AuthLayer::new(state.auth.clone()));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/menu", get(public_menu))
        .route("/api/orders", create_order_route)
        .route("/api/pages", get(list_pages))
        .route("/api/pages/:id", get(get_page))
        .route("/api/params", get(get_params))
        .route("/api/settings/:key", get(get_setting))
        .route("/ws", get(ws_handler))
        .nest("/api/admin", admin)
        .layer(RequestBodyLimitLayer::new(config.http.max_body_size))
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new())
        .with_state(state)
}

/// Unwrap a JSON body, reporting malformed input as a 400 in the usual error shape.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "subscribers": state.bus.total_subscribers(),
    }))
}

async fn public_menu(State(state): State<AppState>) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.menu.get_menu(false).await?))
}

async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<NewOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.orders.create(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_page_size")]
    limit: usize,
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

async fn list_orders(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> ApiResult<Json<Paginated<Order>>> {
    Ok(Json(state.orders.list(page.offset, page.limit).await?))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.get(id).await?))
}

async fn delete_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

async fn set_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let StatusBody { status } = json_body(body)?;
    state.orders.set_status(id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_order_seen(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.orders.mark_seen(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_menu(State(state): State<AppState>) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.menu.get_menu(true).await?))
}

async fn upsert_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.menu.upsert_product(id, json_body(body)?).await?))
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.menu.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_group(
    State(state): State<AppState>,
    body: Result<Json<GroupInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductGroup>)> {
    let group = state.menu.add_group(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    name: String,
}

async fn rename_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<RenameBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let RenameBody { name } = json_body(body)?;
    state.menu.edit_group(id, name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_group(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.menu.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// New order of children, first id gets index 0.
#[derive(Debug, Deserialize)]
struct OrderingBody {
    ids: Vec<Uuid>,
}

async fn set_group_order(
    State(state): State<AppState>,
    Path(menu_id): Path<Uuid>,
    body: Result<Json<OrderingBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let OrderingBody { ids } = json_body(body)?;
    state.menu.set_group_ordering(menu_id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_product_order(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    body: Result<Json<OrderingBody>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let OrderingBody { ids } = json_body(body)?;
    state.menu.set_product_ordering(group_id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_pages(State(state): State<AppState>) -> ApiResult<Json<Vec<Page>>> {
    Ok(Json(state.pages.list().await?))
}

async fn get_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Page>> {
    Ok(Json(state.pages.get(&id).await?))
}

async fn create_page(
    State(state): State<AppState>,
    body: Result<Json<Page>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Page>)> {
    let page = state.pages.insert(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Page>, JsonRejection>,
) -> ApiResult<Json<Page>> {
    Ok(Json(state.pages.update(&id, json_body(body)?).await?))
}

async fn delete_page(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.pages.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_params(State(state): State<AppState>) -> ApiResult<Json<SiteParams>> {
    Ok(Json(state.params.get().await?))
}

async fn set_header(
    State(state): State<AppState>,
    body: Result<Json<HeaderInput>, JsonRejection>,
) -> ApiResult<Json<SiteParams>> {
    Ok(Json(state.params.set_header(json_body(body)?).await?))
}

async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(state.params.get_setting(&key).await?))
}

async fn upsert_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<StatusCode> {
    state.params.upsert_setting(&key, json_body(body)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryMenuRepository, InMemoryOrderRepository, InMemoryPageRepository,
        InMemoryParamsRepository,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use shared_bus::{ChangeNotifier, EventPublisher};
    use shared_types::ProductGroup;
    use tower::ServiceExt;

    const TOKEN: &str = "router-test-admin-token";

    struct Fixture {
        router: Router,
        bus: Arc<NotificationBus>,
        menu_id: Uuid,
        group_id: Uuid,
        product_id: Uuid,
        hidden_id: Uuid,
    }

    fn fixture(config: GatewayConfig) -> Fixture {
        let bus = Arc::new(NotificationBus::new());
        let notifier = ChangeNotifier::new(Arc::clone(&bus) as Arc<dyn EventPublisher>);

        let menu_id = Uuid::new_v4();
        let group_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let hidden_id = Uuid::new_v4();
        let product = |id, name: &str, hidden| Product {
            id,
            group_id,
            name: name.into(),
            description: String::new(),
            price: 4.5,
            index: 0,
            hidden,
        };
        let menu_repo = Arc::new(InMemoryMenuRepository::new().with_menu(Menu {
            id: menu_id,
            name: "Kitchen".into(),
            index: 0,
            groups: vec![ProductGroup {
                id: group_id,
                menu_id,
                name: "Soups".into(),
                index: 0,
                products: vec![product(product_id, "Borscht", false), product(hidden_id, "Secret", true)],
            }],
        }));
        let order_repo = Arc::new(InMemoryOrderRepository::new());

        let state = AppState {
            orders: OrderService::new(order_repo, menu_repo.clone(), notifier.clone()),
            menu: MenuService::new(menu_repo, notifier),
            pages: PageService::new(Arc::new(InMemoryPageRepository::new())),
            params: ParamsService::new(Arc::new(InMemoryParamsRepository::new())),
            bus: Arc::clone(&bus),
            auth: AdminAuth::new(config.admin.token.clone()),
            session: SessionConfig::from(&config.websocket),
            shutdown: CancellationToken::new(),
        };
        let router = build_router(state, &config, Arc::new(RateLimiter::new()));
        Fixture {
            router,
            bus,
            menu_id,
            group_id,
            product_id,
            hidden_id,
        }
    }

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.admin.token = Some(TOKEN.into());
        config
    }

    fn order_request(product_id: Uuid) -> Request<Body> {
        let body = serde_json::json!({
            "id": Uuid::new_v4(),
            "name": "Table 4",
            "items": [{"id": product_id, "amount": 2}],
        });
        Request::post("/api/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn public_get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let fx = fixture(config());
        let response = fx
            .router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_public_menu_hides_hidden_products() {
        let fx = fixture(config());
        let response = fx
            .router
            .oneshot(Request::get("/api/menu").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let menus = json(response).await;
        let products = menus[0]["groups"][0]["products"].as_array().unwrap().clone();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["id"], fx.product_id.to_string());
    }

    #[tokio::test]
    async fn test_create_order_notifies_admin_channel() {
        let fx = fixture(config());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        fx.bus.subscribe_fn(shared_bus::CHANNEL_ADMIN, move |msg| {
            let _ = tx.send(msg);
        });

        let response = fx.router.oneshot(order_request(fx.product_id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let order = json(response).await;
        assert_eq!(order["items"][0]["amount"], 2);

        assert_eq!(rx.recv().await.unwrap().event_name(), "orders_changed");
    }

    #[tokio::test]
    async fn test_create_order_rejects_hidden_product() {
        let fx = fixture(config());
        let response = fx.router.oneshot(order_request(fx.hidden_id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let fx = fixture(config());
        let response = fx
            .router
            .oneshot(
                Request::post("/api/orders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_create_order_rate_limited_per_ip() {
        let fx = fixture(config());
        for _ in 0..5 {
            let response = fx.router.clone().oneshot(order_request(fx.product_id)).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }
        let response = fx.router.oneshot(order_request(fx.product_id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_rate_limit_can_be_disabled() {
        let mut config = config();
        config.rate_limit.enabled = false;
        let fx = fixture(config);
        for _ in 0..8 {
            let response = fx.router.clone().oneshot(order_request(fx.product_id)).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let fx = fixture(config());
        let denied = fx
            .router
            .clone()
            .oneshot(Request::get("/api/admin/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = fx
            .router
            .oneshot(
                Request::get("/api/admin/orders?limit=10")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        let page = json(allowed).await;
        assert_eq!(page["total"], 0);
        assert_eq!(page["limit"], 10);
    }

    #[tokio::test]
    async fn test_admin_status_update_and_missing_order() {
        let fx = fixture(config());
        let created = json(fx.router.clone().oneshot(order_request(fx.product_id)).await.unwrap()).await;
        let id = created["id"].as_str().unwrap().to_string();

        let status = |id: &str, body: &'static str| {
            Request::put(format!("/api/admin/orders/{id}/status"))
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap()
        };

        let ok = fx
            .router
            .clone()
            .oneshot(status(&id, r#"{"status":"finished"}"#))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);

        let missing = fx
            .router
            .oneshot(status(&Uuid::new_v4().to_string(), r#"{"status":"finished"}"#))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_menu_includes_hidden_products() {
        let fx = fixture(config());
        let response = fx
            .router
            .oneshot(
                Request::get("/api/admin/menu")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let menus = json(response).await;
        assert_eq!(menus[0]["groups"][0]["products"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_group_routes_notify_admins() {
        let fx = fixture(config());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        fx.bus.subscribe_fn(shared_bus::CHANNEL_ADMIN, move |msg| {
            let _ = tx.send(msg);
        });

        let new_group = Uuid::new_v4();
        let created = fx
            .router
            .clone()
            .oneshot(admin(
                "POST",
                "/api/admin/groups",
                serde_json::json!({"id": new_group, "menu_id": fx.menu_id, "name": "Desserts"}),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(created).await["name"], "Desserts");

        let renamed = fx
            .router
            .clone()
            .oneshot(admin(
                "PUT",
                &format!("/api/admin/groups/{}", fx.group_id),
                serde_json::json!({"name": "Hot soups"}),
            ))
            .await
            .unwrap();
        assert_eq!(renamed.status(), StatusCode::NO_CONTENT);

        let deleted = fx
            .router
            .clone()
            .oneshot(admin(
                "DELETE",
                &format!("/api/admin/groups/{new_group}"),
                serde_json::Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().event_name(), "menu_changed");
        }

        let duplicate = fx
            .router
            .oneshot(admin(
                "POST",
                "/api/admin/groups",
                serde_json::json!({"id": fx.group_id, "menu_id": fx.menu_id, "name": "Again"}),
            ))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_pages_public_read_admin_write() {
        let fx = fixture(config());
        let page = serde_json::json!({
            "id": "about",
            "title": "About us",
            "elements": [{"id": "intro", "type": "text", "params": {"text": "Since 1998"}}],
        });

        let denied = fx
            .router
            .clone()
            .oneshot(
                Request::post("/api/admin/pages")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(page.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let created = fx
            .router
            .clone()
            .oneshot(admin("POST", "/api/admin/pages", page.clone()))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let fetched = json(fx.router.clone().oneshot(public_get("/api/pages/about")).await.unwrap()).await;
        assert_eq!(fetched["elements"][0]["type"], "text");
        let listed = json(fx.router.clone().oneshot(public_get("/api/pages")).await.unwrap()).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let conflict = fx
            .router
            .clone()
            .oneshot(admin("POST", "/api/admin/pages", page))
            .await
            .unwrap();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let deleted = fx
            .router
            .clone()
            .oneshot(admin("DELETE", "/api/admin/pages/about", serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let missing = fx.router.oneshot(public_get("/api/pages/about")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_params_and_settings_routes() {
        let fx = fixture(config());
        let empty = json(fx.router.clone().oneshot(public_get("/api/params")).await.unwrap()).await;
        assert!(empty["header_text"].is_null());

        let deadline = chrono::Utc::now() + chrono::Duration::hours(2);
        let set = fx
            .router
            .clone()
            .oneshot(admin(
                "PUT",
                "/api/admin/params/header",
                serde_json::json!({"text": "Closed for lunch", "deadline": deadline}),
            ))
            .await
            .unwrap();
        assert_eq!(set.status(), StatusCode::OK);
        let params = json(fx.router.clone().oneshot(public_get("/api/params")).await.unwrap()).await;
        assert_eq!(params["header_text"], "Closed for lunch");

        let stored = fx
            .router
            .clone()
            .oneshot(admin(
                "PUT",
                "/api/admin/settings/background",
                serde_json::json!({"color": "#fafafa"}),
            ))
            .await
            .unwrap();
        assert_eq!(stored.status(), StatusCode::NO_CONTENT);
        let setting = json(
            fx.router
                .clone()
                .oneshot(public_get("/api/settings/background"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(setting["color"], "#fafafa");

        let unknown = fx
            .router
            .oneshot(admin("PUT", "/api/admin/settings/theme", serde_json::json!(1)))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    }
}
