//! Adapters for the API Gateway.
//!
//! Infrastructure implementations of the outbound ports.

pub mod memory;

pub use memory::{
    InMemoryMenuRepository, InMemoryOrderRepository, InMemoryPageRepository,
    InMemoryParamsRepository,
};
