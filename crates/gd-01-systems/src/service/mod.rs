//! # Service Layer
//!
//! - [`SystemRegistry`]: CRUD, patching, reload and rescan
//! - [`RemovalCoordinator`]: the stop / wait / cleanup / delete protocol

pub mod registry;
pub mod removal;

#[cfg(test)]
pub(crate) mod test_utils;

pub use registry::SystemRegistry;
pub use removal::{RemovalCoordinator, DEFAULT_SHUTDOWN_TIMEOUT_SECS, POLL_INTERVAL};
