//! # Garden Test Suite
//!
//! Cross-crate integration flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── system_lifecycle.rs   # Router → registry → event bus
//!     ├── removal_flows.rs      # Remote and local removal end to end
//!     └── local_plugins.rs      # Runtime-supervised plugin processes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gd-tests
//! cargo test -p gd-tests integration::removal_flows
//! ```

pub mod integration;
