//! Order service: placing, listing and administering customer orders.

use crate::domain::error::ServiceError;
use crate::ports::outbound::{MenuRepository, OrderRepository};
use chrono::Utc;
use shared_bus::ChangeNotifier;
use shared_types::{NewOrderRequest, Order, OrderItem, OrderStatus, Paginated};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Most positions a single order may contain.
pub const MAX_POSITIONS: usize = 10;

/// Most units of one product per position.
pub const MAX_AMOUNT: u32 = 10;

/// Highest accepted order total.
pub const MAX_TOTAL_PRICE: f64 = 99_999.0;

/// Largest page the admin listing returns.
pub const MAX_PAGE_SIZE: usize = 100;

/// Business logic for orders. Every mutation except `mark_seen` notifies the
/// admin channel.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    menu: Arc<dyn MenuRepository>,
    notifier: ChangeNotifier,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        menu: Arc<dyn MenuRepository>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            orders,
            menu,
            notifier,
        }
    }

    /// Validate and store a customer order.
    ///
    /// Names and prices are taken from the menu, never from the request.
    /// Resubmitting an id that already exists returns the stored order without
    /// a second notification.
    #[instrument(skip(self, req), fields(order_id = %req.id))]
    pub async fn create(&self, req: NewOrderRequest) -> Result<Order, ServiceError> {
        if req.items.is_empty() {
            return Err(ServiceError::Validation("order has no items".into()));
        }
        if req.items.len() > MAX_POSITIONS {
            return Err(ServiceError::Validation(format!(
                "too many positions: {} > {MAX_POSITIONS}",
                req.items.len()
            )));
        }
        if req.name.trim().is_empty() {
            return Err(ServiceError::Validation("client name is required".into()));
        }

        let mut items = Vec::with_capacity(req.items.len());
        for requested in &req.items {
            if requested.amount == 0 || requested.amount > MAX_AMOUNT {
                return Err(ServiceError::Validation(format!(
                    "amount of {} must be between 1 and {MAX_AMOUNT}",
                    requested.id
                )));
            }
            let product = self
                .menu
                .get_product(requested.id)
                .await?
                .filter(|p| !p.hidden)
                .ok_or_else(|| ServiceError::Validation(format!("unknown product {}", requested.id)))?;

            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                amount: requested.amount,
            });
        }

        let order = Order {
            id: req.id,
            client_name: req.name,
            client_comment: req.comment,
            status: OrderStatus::Open,
            seen: false,
            items,
            created_at: Utc::now(),
        };

        let total = order.total_price();
        if total > MAX_TOTAL_PRICE {
            return Err(ServiceError::Validation(format!(
                "order total {total:.2} exceeds {MAX_TOTAL_PRICE}"
            )));
        }

        if !self.orders.insert(order.clone()).await? {
            debug!("Duplicate order submission");
            return self
                .orders
                .get(order.id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("order {}", order.id)));
        }

        info!(positions = order.items.len(), total, "Order created");
        self.notifier.notify_orders_changed().await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<(), ServiceError> {
        if !self.orders.set_status(id, status).await? {
            return Err(ServiceError::NotFound(format!("order {id}")));
        }
        info!(order_id = %id, status = status.as_str(), "Order status changed");
        self.notifier.notify_orders_changed().await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.orders.delete(id).await? {
            return Err(ServiceError::NotFound(format!("order {id}")));
        }
        info!(order_id = %id, "Order deleted");
        self.notifier.notify_orders_changed().await;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, ServiceError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))
    }

    /// Newest-first page of orders. `limit` is clamped to [`MAX_PAGE_SIZE`].
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Paginated<Order>, ServiceError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let (items, total) = self.orders.list(offset, limit).await?;
        Ok(Paginated {
            items,
            total,
            offset,
            limit,
        })
    }

    /// Flag an order as opened by an administrator. Silent: no notification.
    pub async fn mark_seen(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.orders.mark_seen(id).await? {
            return Err(ServiceError::NotFound(format!("order {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryMenuRepository, InMemoryOrderRepository};
    use parking_lot::Mutex;
    use shared_bus::{NotificationBus, WsMessage, CHANNEL_ADMIN};
    use shared_types::{Menu, NewOrderItem, Product, ProductGroup};

    struct Fixture {
        service: OrderService,
        events: Arc<Mutex<Vec<WsMessage>>>,
        dal: Uuid,
        naan: Uuid,
        hidden: Uuid,
        _bus: Arc<NotificationBus>,
    }

    fn product(name: &str, price: f64, hidden: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            group_id: Uuid::nil(),
            name: name.into(),
            description: String::new(),
            price,
            index: 0,
            hidden,
        }
    }

    fn fixture() -> Fixture {
        let dal = product("Dal", 450.0, false);
        let naan = product("Naan", 90.0, false);
        let hidden = product("Secret", 1.0, true);
        let ids = (dal.id, naan.id, hidden.id);
        let menu = InMemoryMenuRepository::new().with_menu(Menu {
            id: Uuid::new_v4(),
            name: "Kitchen".into(),
            index: 0,
            groups: vec![ProductGroup {
                id: Uuid::new_v4(),
                menu_id: Uuid::nil(),
                name: "Mains".into(),
                index: 0,
                products: vec![dal, naan, hidden],
            }],
        });

        let bus = Arc::new(NotificationBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        // Dropping a handle does not unsubscribe.
        let _handle = bus.subscribe_fn(CHANNEL_ADMIN, move |m| sink.lock().push(m));

        let service = OrderService::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(menu),
            ChangeNotifier::new(bus.clone()),
        );
        Fixture {
            service,
            events,
            dal: ids.0,
            naan: ids.1,
            hidden: ids.2,
            _bus: bus,
        }
    }

    fn request(items: Vec<(Uuid, u32)>) -> NewOrderRequest {
        NewOrderRequest {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            comment: "no onions".into(),
            items: items
                .into_iter()
                .map(|(id, amount)| NewOrderItem { id, amount })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_prices_from_menu_and_notifies() {
        let f = fixture();
        let order = f
            .service
            .create(request(vec![(f.dal, 2), (f.naan, 3)]))
            .await
            .unwrap();

        assert_eq!(order.items[0].name, "Dal");
        assert_eq!(order.total_price(), 450.0 * 2.0 + 90.0 * 3.0);
        assert_eq!(order.status, OrderStatus::Open);
        assert!(!order.seen);

        let events = f.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name(), "orders_changed");
    }

    #[tokio::test]
    async fn test_create_rejects_too_many_positions() {
        let f = fixture();
        let items = vec![(f.naan, 1); MAX_POSITIONS + 1];
        let err = f.service.create(request(items)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_excessive_amount() {
        let f = fixture();
        let err = f
            .service
            .create(request(vec![(f.naan, MAX_AMOUNT + 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_and_hidden_products() {
        let f = fixture();
        for id in [Uuid::new_v4(), f.hidden] {
            let err = f.service.create(request(vec![(id, 1)])).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_create_rejects_total_over_limit() {
        let f = fixture();
        let product = product("Caviar", 20_000.0, false);
        let caviar = product.id;
        let menu = InMemoryMenuRepository::new().with_menu(Menu {
            id: Uuid::new_v4(),
            name: "Luxury".into(),
            index: 0,
            groups: vec![ProductGroup {
                id: Uuid::new_v4(),
                menu_id: Uuid::nil(),
                name: "Fish".into(),
                index: 0,
                products: vec![product],
            }],
        });
        let service = OrderService::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(menu),
            f.service.notifier.clone(),
        );

        let err = service.create(request(vec![(caviar, 5)])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("exceeds")));
    }

    #[tokio::test]
    async fn test_duplicate_submission_notifies_once() {
        let f = fixture();
        let req = request(vec![(f.dal, 1)]);
        let first = f.service.create(req.clone()).await.unwrap();
        let second = f.service.create(req).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(f.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_status_and_delete_notify_but_mark_seen_does_not() {
        let f = fixture();
        let order = f.service.create(request(vec![(f.dal, 1)])).await.unwrap();

        f.service.mark_seen(order.id).await.unwrap();
        assert_eq!(f.events.lock().len(), 1);
        assert!(f.service.get(order.id).await.unwrap().seen);

        f.service
            .set_status(order.id, OrderStatus::Finished)
            .await
            .unwrap();
        assert_eq!(f.events.lock().len(), 2);
        assert_eq!(
            f.service.get(order.id).await.unwrap().status,
            OrderStatus::Finished
        );

        f.service.delete(order.id).await.unwrap();
        assert_eq!(f.events.lock().len(), 3);
        assert!(matches!(
            f.service.get(order.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found_and_silent() {
        let f = fixture();
        let id = Uuid::new_v4();
        assert!(matches!(
            f.service.set_status(id, OrderStatus::Cancelled).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(f.service.delete(id).await, Err(ServiceError::NotFound(_))));
        assert!(f.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_list_clamps_limit() {
        let f = fixture();
        for _ in 0..3 {
            f.service.create(request(vec![(f.naan, 1)])).await.unwrap();
        }
        let page = f.service.list(0, 0).await.unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 3);

        let page = f.service.list(0, 10_000).await.unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.items.len(), 3);
    }
}
