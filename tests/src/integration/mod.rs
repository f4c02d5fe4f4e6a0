//! Cross-crate flows: the real service container and router, with
//! WebSocket clients attached through in-process transports.

pub mod harness;

#[cfg(test)]
mod flows;
#[cfg(test)]
mod rate_limiting;
