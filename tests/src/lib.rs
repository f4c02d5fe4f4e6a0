//! # Tandoor Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs         # Node wiring + in-process WebSocket clients
//!     ├── flows.rs           # HTTP writes → bus → admin sessions
//!     └── rate_limiting.rs   # Order intake limits over HTTP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tandoor-tests
//! cargo test -p tandoor-tests integration::flows
//! ```

pub mod integration;
