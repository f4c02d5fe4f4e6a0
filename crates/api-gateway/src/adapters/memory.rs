//! In-memory storage adapters.
//!
//! Used by the runtime when no external store is configured, and by tests.

use crate::domain::error::ServiceError;
use crate::domain::pages::Page;
use crate::domain::params::SiteParams;
use crate::ports::outbound::{
    MenuRepository, OrderRepository, PageRepository, ParamsRepository, StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{Menu, Order, OrderStatus, Product, ProductGroup};
use std::collections::HashMap;
use uuid::Uuid;

/// Order storage backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut Order),
    {
        match self.orders.write().get_mut(&id) {
            Some(order) => {
                apply(order);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: Order) -> StoreResult<bool> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Ok(false);
        }
        orders.insert(order.id, order);
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().get(&id).cloned())
    }

    async fn list(&self, offset: usize, limit: usize) -> StoreResult<(Vec<Order>, u64)> {
        let orders = self.orders.read();
        let mut all: Vec<&Order> = orders.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let page = all.into_iter().skip(offset).take(limit).cloned().collect();
        Ok((page, orders.len() as u64))
    }

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<bool> {
        Ok(self.update(id, |order| order.status = status))
    }

    async fn mark_seen(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.update(id, |order| order.seen = true))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.orders.write().remove(&id).is_some())
    }
}

#[derive(Default)]
struct MenuTables {
    menus: HashMap<Uuid, Menu>,
    groups: HashMap<Uuid, ProductGroup>,
    products: HashMap<Uuid, Product>,
}

/// Menu storage backed by flat `HashMap` tables.
#[derive(Default)]
pub struct InMemoryMenuRepository {
    tables: RwLock<MenuTables>,
}

impl InMemoryMenuRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a whole menu tree, splitting it into flat rows.
    pub fn with_menu(self, menu: Menu) -> Self {
        self.load_menu(menu);
        self
    }

    /// Load a whole menu tree, splitting it into flat rows.
    pub fn load_menu(&self, mut menu: Menu) {
        let mut tables = self.tables.write();
        for mut group in std::mem::take(&mut menu.groups) {
            group.menu_id = menu.id;
            for mut product in std::mem::take(&mut group.products) {
                product.group_id = group.id;
                tables.products.insert(product.id, product);
            }
            tables.groups.insert(group.id, group);
        }
        tables.menus.insert(menu.id, menu);
    }
}

#[async_trait]
impl MenuRepository for InMemoryMenuRepository {
    async fn menus(&self) -> StoreResult<Vec<Menu>> {
        Ok(self.tables.read().menus.values().cloned().collect())
    }

    async fn groups(&self) -> StoreResult<Vec<ProductGroup>> {
        Ok(self.tables.read().groups.values().cloned().collect())
    }

    async fn products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.tables.read().products.values().cloned().collect())
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().products.get(&id).cloned())
    }

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<ProductGroup>> {
        Ok(self.tables.read().groups.get(&id).cloned())
    }

    async fn upsert_product(&self, product: Product) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.groups.contains_key(&product.group_id) {
            return Err(ServiceError::NotFound(format!(
                "product group {}",
                product.group_id
            )));
        }
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().products.remove(&id).is_some())
    }

    async fn insert_group(&self, group: ProductGroup) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.menus.contains_key(&group.menu_id) {
            return Err(ServiceError::NotFound(format!("menu {}", group.menu_id)));
        }
        if tables.groups.contains_key(&group.id) {
            return Ok(false);
        }
        tables.groups.insert(group.id, group);
        Ok(true)
    }

    async fn rename_group(&self, id: Uuid, name: String) -> StoreResult<bool> {
        Ok(match self.tables.write().groups.get_mut(&id) {
            Some(group) => {
                group.name = name;
                true
            }
            None => false,
        })
    }

    async fn delete_group(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.groups.remove(&id).is_none() {
            return Ok(false);
        }
        tables.products.retain(|_, product| product.group_id != id);
        Ok(true)
    }

    async fn set_group_indexes(&self, indexes: &[(Uuid, i32)]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        // Check everything first so a failure leaves no partial update
        if let Some((missing, _)) = indexes
            .iter()
            .find(|(id, _)| !tables.groups.contains_key(id))
        {
            return Err(ServiceError::NotFound(format!("product group {missing}")));
        }
        for (id, index) in indexes {
            if let Some(group) = tables.groups.get_mut(id) {
                group.index = *index;
            }
        }
        Ok(())
    }

    async fn set_product_indexes(&self, indexes: &[(Uuid, i32)]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if let Some((missing, _)) = indexes
            .iter()
            .find(|(id, _)| !tables.products.contains_key(id))
        {
            return Err(ServiceError::NotFound(format!("product {missing}")));
        }
        for (id, index) in indexes {
            if let Some(product) = tables.products.get_mut(id) {
                product.index = *index;
            }
        }
        Ok(())
    }
}

/// Page storage backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryPageRepository {
    pages: RwLock<HashMap<String, Page>>,
}

impl InMemoryPageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageRepository for InMemoryPageRepository {
    async fn get(&self, id: &str) -> StoreResult<Option<Page>> {
        Ok(self.pages.read().get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Page>> {
        Ok(self.pages.read().values().cloned().collect())
    }

    async fn insert(&self, page: Page) -> StoreResult<bool> {
        let mut pages = self.pages.write();
        if pages.contains_key(&page.id) {
            return Ok(false);
        }
        pages.insert(page.id.clone(), page);
        Ok(true)
    }

    async fn update(&self, page: Page) -> StoreResult<bool> {
        Ok(match self.pages.write().get_mut(&page.id) {
            Some(stored) => {
                *stored = page;
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.pages.write().remove(id).is_some())
    }
}

/// Site parameters and settings held in memory.
#[derive(Default)]
pub struct InMemoryParamsRepository {
    params: RwLock<SiteParams>,
    settings: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryParamsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParamsRepository for InMemoryParamsRepository {
    async fn params(&self) -> StoreResult<SiteParams> {
        Ok(self.params.read().clone())
    }

    async fn set_params(&self, params: SiteParams) -> StoreResult<()> {
        *self.params.write() = params;
        Ok(())
    }

    async fn clear_header_before(&self, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut params = self.params.write();
        match params.header_deadline {
            Some(deadline) if deadline <= now => {
                *params = SiteParams::default();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn setting(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.settings.read().get(key).cloned())
    }

    async fn set_setting(&self, key: String, value: serde_json::Value) -> StoreResult<()> {
        self.settings.write().insert(key, value);
        Ok(())
    }
}
