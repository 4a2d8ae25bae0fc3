//! # Error Types
//!
//! Errors reported by collaborators shared across crates.

use thiserror::Error;

use crate::entities::SystemId;

/// Errors from the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No System with this identifier.
    #[error("System not found: {0}")]
    NotFound(SystemId),

    /// Another System already holds this name and version.
    #[error("System {name}-{version} already exists")]
    Duplicate { name: String, version: String },

    /// Backend failure.
    #[error("Database error: {0}")]
    Backend(String),
}
