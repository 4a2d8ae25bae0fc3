//! # Core Domain Entities
//!
//! Defines the entities the control plane registers and mutates.
//!
//! ## Clusters
//!
//! - **Systems**: `System`, `SystemId`
//! - **Instances**: `Instance`, `InstanceStatus`, `QueueInfo`
//! - **Commands**: `Command`, `Parameter`

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// CLUSTER A: SYSTEMS
// =============================================================================

/// Surrogate identifier of a stored System.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(pub String);

impl SystemId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SystemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SystemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A versioned, named collection of commands backed by one or more instances.
///
/// Unique by `(name, version)`. The System exclusively owns its instance
/// list; `instances.len() <= max_instances` holds for every persisted state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct System {
    /// Storage identifier, assigned on first persist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SystemId>,
    /// System name.
    pub name: String,
    /// System version string (may carry a `dev` marker).
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Display name shown by user interfaces.
    #[serde(default)]
    pub display_name: String,
    /// Icon shown by user interfaces.
    #[serde(default)]
    pub icon_name: String,
    /// Upper bound on the number of instances. `None` until creation fixes it.
    #[serde(default)]
    pub max_instances: Option<u32>,
    /// Ordered instances of this system.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Command definitions exposed by this system.
    #[serde(default)]
    pub commands: Vec<Command>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl System {
    /// Create a bare system with no instances or commands.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to set instances.
    #[must_use]
    pub fn with_instances(mut self, instances: Vec<Instance>) -> Self {
        self.instances = instances;
        self
    }

    /// Builder-style helper to set the instance limit.
    #[must_use]
    pub fn with_max_instances(mut self, max_instances: u32) -> Self {
        self.max_instances = Some(max_instances);
        self
    }

    /// Builder-style helper to set commands.
    #[must_use]
    pub fn with_commands(mut self, commands: Vec<Command>) -> Self {
        self.commands = commands;
        self
    }

    /// `name-version`, used in log lines and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Whether the version string carries the `dev` marker.
    #[must_use]
    pub fn is_dev_version(&self) -> bool {
        self.version.contains("dev")
    }

    /// Look up an instance by name.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// True when every instance reports `STOPPED` (vacuously true with none).
    #[must_use]
    pub fn all_instances_stopped(&self) -> bool {
        self.instances.iter().all(Instance::is_stopped)
    }

    /// Whether `commands` differs from the commands this system already has.
    ///
    /// Commands are compared by name; same-named commands are compared by
    /// their parameter keys. Ordering is irrelevant.
    #[must_use]
    pub fn has_different_commands(&self, commands: &[Command]) -> bool {
        if commands.len() != self.commands.len() {
            return true;
        }

        commands.iter().any(|proposed| {
            match self.commands.iter().find(|c| c.name == proposed.name) {
                Some(existing) => existing.has_different_parameters(&proposed.parameters),
                None => true,
            }
        })
    }
}

// =============================================================================
// CLUSTER B: INSTANCES
// =============================================================================

/// Lifecycle status reported by an instance.
///
/// Only `Stopped` carries meaning for the control plane; the rest are
/// transitional values passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Registered but not yet started.
    #[default]
    Initializing,
    /// Process is starting.
    Starting,
    /// Consuming requests.
    Running,
    /// Temporarily not consuming requests.
    Paused,
    /// Process is shutting down.
    Stopping,
    /// Shutdown confirmed.
    Stopped,
    /// Re-reading its command definitions.
    Reloading,
    /// Missed its heartbeat.
    Unresponsive,
    /// Exited without confirming shutdown.
    Dead,
    /// Status could not be determined.
    Unknown,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "INITIALIZING",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Reloading => "RELOADING",
            Self::Unresponsive => "UNRESPONSIVE",
            Self::Dead => "DEAD",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A named queue on the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Queue name.
    pub name: String,
}

/// Queues an instance consumes from. Either entry is absent when the
/// instance never fully started.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Request queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<QueueEntry>,
    /// Admin queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<QueueEntry>,
}

impl QueueInfo {
    /// Queue info carrying both a request and an admin queue.
    #[must_use]
    pub fn new(request: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            request: Some(QueueEntry {
                name: request.into(),
            }),
            admin: Some(QueueEntry { name: admin.into() }),
        }
    }

    /// Name of the request queue, if any.
    #[must_use]
    pub fn request_queue(&self) -> Option<&str> {
        self.request.as_ref().map(|q| q.name.as_str())
    }

    /// Name of the admin queue, if any.
    #[must_use]
    pub fn admin_queue(&self) -> Option<&str> {
        self.admin.as_ref().map(|q| q.name.as_str())
    }
}

/// One running (or previously running) execution unit of a System.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name, unique within its system.
    pub name: String,
    /// Last reported status.
    #[serde(default)]
    pub status: InstanceStatus,
    /// Queues this instance consumes from.
    #[serde(default)]
    pub queue_info: QueueInfo,
}

impl Instance {
    /// Create an instance in the `INITIALIZING` state with no queues.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to set the status.
    #[must_use]
    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style helper to set the queue info.
    #[must_use]
    pub fn with_queues(mut self, queue_info: QueueInfo) -> Self {
        self.queue_info = queue_info;
        self
    }

    /// Whether this instance confirmed shutdown.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status == InstanceStatus::Stopped
    }
}

// =============================================================================
// CLUSTER C: COMMANDS
// =============================================================================

/// A single parameter of a command.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter key.
    pub key: String,
    /// Declared type, e.g. `String` or `Integer`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Whether the parameter may be omitted.
    #[serde(default)]
    pub optional: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Parameter {
    /// Required parameter of the given type.
    #[must_use]
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// A command definition exposed by a System.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    /// Command name.
    pub name: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Parameters accepted by the command.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Command {
    /// Command with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to add a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Whether the parameter key set differs from `parameters`.
    #[must_use]
    pub fn has_different_parameters(&self, parameters: &[Parameter]) -> bool {
        let ours: BTreeSet<&str> = self.parameters.iter().map(|p| p.key.as_str()).collect();
        let theirs: BTreeSet<&str> = parameters.iter().map(|p| p.key.as_str()).collect();
        ours != theirs || self.parameters.len() != parameters.len()
    }
}
