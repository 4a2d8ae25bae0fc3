//! Error types for the Systems subsystem

use shared_types::{StoreError, SystemId};
use thiserror::Error;

use crate::ports::outbound::{PluginError, QueueError};

/// Systems subsystem errors
///
/// The first three variants are caller errors and propagate unchanged.
/// The rest wrap collaborator failures that could not be contained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    /// Malformed dispatch: missing id or payload, unknown route kind
    #[error("Routing request error: {0}")]
    RoutingRequest(String),

    /// Unsupported patch, command conflict, instance limit
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown system id
    #[error("System not found: {0}")]
    NotFound(SystemId),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Message bus failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Plugin manager or registry failure
    #[error("Plugin error: {0}")]
    Plugin(String),
}

/// Result type for systems operations
pub type SystemResult<T> = Result<T, SystemError>;

impl SystemError {
    /// Whether this error is the caller's fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::RoutingRequest(_) | Self::Validation(_) | Self::NotFound(_)
        )
    }
}

impl From<StoreError> for SystemError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Duplicate { .. } => Self::Validation(err.to_string()),
            StoreError::Backend(reason) => Self::Storage(reason),
        }
    }
}

impl From<QueueError> for SystemError {
    fn from(err: QueueError) -> Self {
        Self::Queue(err.to_string())
    }
}

impl From<PluginError> for SystemError {
    fn from(err: PluginError) -> Self {
        Self::Plugin(err.to_string())
    }
}
