//! Outbound ports for the API Gateway.
//!
//! Storage is reached only through these traits; the in-memory adapters in
//! `crate::adapters::memory` implement them.

use crate::domain::error::ServiceError;
use crate::domain::pages::Page;
use crate::domain::params::SiteParams;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{Menu, Order, OrderStatus, Product, ProductGroup};
use uuid::Uuid;

/// Result type for storage calls
pub type StoreResult<T> = Result<T, ServiceError>;

/// Persistent order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Store a new order. Returns `false` (and stores nothing) if an order
    /// with the same id already exists.
    async fn insert(&self, order: Order) -> StoreResult<bool>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// One page of orders, newest first, plus the total count.
    async fn list(&self, offset: usize, limit: usize) -> StoreResult<(Vec<Order>, u64)>;

    /// Returns `false` if the order does not exist.
    async fn set_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<bool>;

    /// Returns `false` if the order does not exist.
    async fn mark_seen(&self, id: Uuid) -> StoreResult<bool>;

    /// Returns `false` if the order does not exist.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// Persistent menu storage. Rows are flat; the service assembles the tree.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn menus(&self) -> StoreResult<Vec<Menu>>;

    async fn groups(&self) -> StoreResult<Vec<ProductGroup>>;

    async fn products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<ProductGroup>>;

    /// Insert or replace a product.
    async fn upsert_product(&self, product: Product) -> StoreResult<()>;

    /// Returns `false` if the product does not exist.
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;

    /// Store a new group. Returns `false` (and stores nothing) if a group
    /// with the same id exists; fails if its menu does not.
    async fn insert_group(&self, group: ProductGroup) -> StoreResult<bool>;

    /// Returns `false` if the group does not exist.
    async fn rename_group(&self, id: Uuid, name: String) -> StoreResult<bool>;

    /// Delete a group together with its products. Returns `false` if the
    /// group does not exist.
    async fn delete_group(&self, id: Uuid) -> StoreResult<bool>;

    /// Apply `(group id, index)` pairs in one transaction.
    async fn set_group_indexes(&self, indexes: &[(Uuid, i32)]) -> StoreResult<()>;

    /// Apply `(product id, index)` pairs in one transaction.
    async fn set_product_indexes(&self, indexes: &[(Uuid, i32)]) -> StoreResult<()>;
}

/// Content page storage, keyed by page id.
#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Page>>;

    async fn list(&self) -> StoreResult<Vec<Page>>;

    /// Returns `false` (and stores nothing) if the id is taken.
    async fn insert(&self, page: Page) -> StoreResult<bool>;

    /// Returns `false` if the page does not exist.
    async fn update(&self, page: Page) -> StoreResult<bool>;

    /// Returns `false` if the page does not exist.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

/// Site parameters and keyed settings.
#[async_trait]
pub trait ParamsRepository: Send + Sync {
    async fn params(&self) -> StoreResult<SiteParams>;

    async fn set_params(&self, params: SiteParams) -> StoreResult<()>;

    /// Clear the header if its deadline is at or before `now`, atomically
    /// with the check. Returns whether anything was cleared.
    async fn clear_header_before(&self, now: DateTime<Utc>) -> StoreResult<bool>;

    async fn setting(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;

    async fn set_setting(&self, key: String, value: serde_json::Value) -> StoreResult<()>;
}
