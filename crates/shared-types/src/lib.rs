//! # Shared Types Crate
//!
//! Domain entities used across the Tandoor workspace.
//!
//! ## Clusters
//!
//! - **Orders**: [`Order`], [`OrderItem`], [`OrderStatus`] and the customer
//!   facing [`NewOrderRequest`].
//! - **Menu**: [`Menu`] → [`ProductGroup`] → [`Product`].
//! - **Paging**: [`Paginated`] result envelope for admin listings.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
