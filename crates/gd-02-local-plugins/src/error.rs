//! Error types for local plugin management

use thiserror::Error;

/// Local plugin manager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalPluginError {
    /// No launch spec with this name
    #[error("Plugin not registered: {0}")]
    NotRegistered(String),

    /// A runner for this plugin is still alive
    #[error("Plugin already running: {0}")]
    AlreadyRunning(String),

    /// No runner for this plugin
    #[error("Plugin not running: {0}")]
    NotRunning(String),

    /// No launch spec belongs to the system
    #[error("No local plugins for system {name}-{version}")]
    NoPluginsForSystem { name: String, version: String },
}
