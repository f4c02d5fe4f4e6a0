//! # Core Domain Entities
//!
//! Orders placed by customers and the menu they are placed against.
//!
//! ## Clusters
//!
//! - **Orders**: `Order`, `OrderItem`, `OrderStatus`, `NewOrderRequest`
//! - **Menu**: `Menu`, `ProductGroup`, `Product`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EntityError;

// =============================================================================
// CLUSTER A: ORDERS
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, not yet handled.
    #[default]
    Open,
    /// Served / handed over.
    Finished,
    /// Cancelled by an administrator.
    Cancelled,
}

impl OrderStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EntityError::UnknownStatus(other.to_string())),
        }
    }
}

/// A single position of a stored order.
///
/// Name and price are copied from the menu when the order is placed, so later
/// menu edits never rewrite order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product the position was created from.
    pub product_id: Uuid,
    /// Product name at the time of ordering.
    pub name: String,
    /// Unit price at the time of ordering.
    pub price: f64,
    /// Number of units.
    pub amount: u32,
}

impl OrderItem {
    /// Price of the whole position.
    pub fn total(&self) -> f64 {
        self.price * f64::from(self.amount)
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub client_name: String,
    pub client_comment: String,
    pub status: OrderStatus,
    /// Whether an administrator has opened the order.
    pub seen: bool,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of all positions.
    pub fn total_price(&self) -> f64 {
        self.items.iter().map(OrderItem::total).sum()
    }
}

/// One requested position of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// Product id.
    pub id: Uuid,
    pub amount: u32,
}

/// Customer request to place an order.
///
/// The id is generated by the client so that retries of the same submission
/// collapse onto one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub comment: String,
    pub items: Vec<NewOrderItem>,
}

// =============================================================================
// CLUSTER B: MENU
// =============================================================================

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    /// Position inside its group.
    #[serde(default)]
    pub index: i32,
    /// Hidden products are kept in the menu tree but cannot be ordered.
    #[serde(default)]
    pub hidden: bool,
}

/// A named group of products inside a menu (e.g. "Soups").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// A top-level menu (e.g. "Kitchen", "Bar").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub groups: Vec<ProductGroup>,
}

// =============================================================================
// CLUSTER C: PAGING
// =============================================================================

/// One page of a listing plus the total number of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: usize,
    pub limit: usize,
}
