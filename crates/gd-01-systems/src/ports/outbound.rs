//! Driven Ports (SPI - Outbound Dependencies)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{Command, SearchParams, StoreError, System, SystemId};
use thiserror::Error;

use crate::domain::routing_key;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// System persistence.
///
/// Every call is atomic per record; nothing spans calls. `NotFound` must be
/// reported as [`StoreError::NotFound`].
#[async_trait]
pub trait SystemStore: Send + Sync {
    /// Load one system by id.
    async fn query_unique(&self, id: &SystemId) -> Result<System, StoreError>;

    /// Load every system matching the criteria.
    async fn query(&self, params: &SearchParams) -> Result<Vec<System>, StoreError>;

    /// Insert a system, or overwrite it when it already has an id.
    async fn create(&self, system: System) -> Result<System, StoreError>;

    /// Overwrite an existing system.
    async fn update(&self, system: System) -> Result<System, StoreError>;

    /// Delete a system.
    async fn delete(&self, system: &System) -> Result<(), StoreError>;

    /// Fresh copy of a system from storage.
    async fn reload(&self, system: &System) -> Result<System, StoreError>;

    /// Swap a system's command set.
    async fn replace_commands(
        &self,
        system: System,
        commands: Vec<Command>,
    ) -> Result<System, StoreError>;
}

// =============================================================================
// MESSAGE BUS
// =============================================================================

/// Message bus failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Failed to publish to {routing_key}: {reason}")]
    Publish { routing_key: String, reason: String },

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Message bus connection error: {0}")]
    Connection(String),
}

/// How a request is treated by the receiving plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Normal, persisted request.
    Action,
    /// Fire-and-forget; never stored.
    Ephemeral,
    /// Handled by the plugin framework, not user code.
    Admin,
}

/// Request placed on the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub system: String,
    pub system_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    pub command: String,
    pub command_type: CommandType,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl QueueMessage {
    /// Command name plugins treat as "shut down".
    pub const STOP_COMMAND: &'static str = "_stop";

    /// Stop request for every instance of a system.
    #[must_use]
    pub fn stop(system: &System) -> Self {
        Self {
            system: system.name.clone(),
            system_version: system.version.clone(),
            instance_name: None,
            command: Self::STOP_COMMAND.to_string(),
            command_type: CommandType::Ephemeral,
            parameters: Map::new(),
        }
    }

    /// Whether this is a stop request.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.command == Self::STOP_COMMAND
    }
}

/// Message bus used to reach remote plugins.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish a message. Best effort: no delivery confirmation.
    async fn publish(&self, message: QueueMessage, routing_key: &str) -> Result<(), QueueError>;

    /// Delete a queue, optionally kicking connected consumers.
    async fn delete_queue(&self, name: &str, force_disconnect: bool) -> Result<(), QueueError>;

    /// Routing key for a system's request or admin queues.
    fn routing_key_for(&self, name: &str, version: &str, is_admin: bool) -> String {
        routing_key(name, version, is_admin)
    }
}

// =============================================================================
// PLUGINS
// =============================================================================

/// Plugin manager and registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("No local plugins for system {name}-{version}")]
    SystemNotLoaded { name: String, version: String },

    #[error("Failed to launch plugin {name}: {reason}")]
    Launch { name: String, reason: String },

    #[error("Plugin directory scan failed: {0}")]
    Scan(String),
}

/// Handle to a locally registered plugin process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginHandle {
    /// Registry key, unique across the process.
    pub unique_name: String,
    pub system_name: String,
    pub system_version: String,
    pub instance_name: String,
}

impl PluginHandle {
    /// Build a handle; the unique name is `name[instance]-version`.
    #[must_use]
    pub fn new(
        system_name: impl Into<String>,
        system_version: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Self {
        let system_name = system_name.into();
        let system_version = system_version.into();
        let instance_name = instance_name.into();
        Self {
            unique_name: format!("{system_name}[{instance_name}]-{system_version}"),
            system_name,
            system_version,
            instance_name,
        }
    }

    /// Whether this handle belongs to the given system.
    #[must_use]
    pub fn belongs_to(&self, name: &str, version: &str) -> bool {
        self.system_name == name && self.system_version == version
    }
}

/// Controls local plugin processes.
#[async_trait]
pub trait PluginManager: Send + Sync {
    /// Restart a system's local plugins so they re-register their commands.
    async fn reload_system(&self, name: &str, version: &str) -> Result<(), PluginError>;

    /// Stop one local plugin. Returns once the process is gone or abandoned.
    async fn stop_plugin(&self, handle: &PluginHandle) -> Result<(), PluginError>;

    /// Look for new plugins in the plugin directory and start them.
    async fn scan_plugin_path(&self) -> Result<(), PluginError>;
}

/// Tracks which local plugins exist.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    /// Local plugin handles for a system, empty when it runs remotely.
    async fn plugins_for_system(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<PluginHandle>, PluginError>;

    /// Forget a plugin.
    async fn remove(&self, unique_name: &str) -> Result<(), PluginError>;
}
