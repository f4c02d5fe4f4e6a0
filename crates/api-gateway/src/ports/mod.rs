//! Ports (hexagonal boundaries) of the API Gateway.

pub mod outbound;

pub use outbound::{
    MenuRepository, OrderRepository, PageRepository, ParamsRepository, StoreResult,
};
