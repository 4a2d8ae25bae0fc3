//! # Lifecycle Events
//!
//! Defines the notifications that flow through the event bus.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // =========================================================================
    // GARDEN
    // =========================================================================
    /// The control plane finished starting.
    GardenStarted,
    /// The control plane is shutting down.
    GardenStopped,

    // =========================================================================
    // SYSTEMS
    // =========================================================================
    /// A System was registered.
    SystemCreated,
    /// A System was patched.
    SystemUpdated,
    /// A System was removed.
    SystemRemoved,
}

impl EventKind {
    /// Wire name, e.g. `SYSTEM_CREATED`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GardenStarted => "GARDEN_STARTED",
            Self::GardenStopped => "GARDEN_STOPPED",
            Self::SystemCreated => "SYSTEM_CREATED",
            Self::SystemUpdated => "SYSTEM_UPDATED",
            Self::SystemRemoved => "SYSTEM_REMOVED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle notification.
///
/// `garden` and `timestamp` stay `None` until the publisher back-fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub name: EventKind,
    /// Garden that emitted the event.
    #[serde(default)]
    pub garden: Option<String>,
    /// When the event was emitted.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Type name of `payload`.
    #[serde(default)]
    pub payload_type: Option<String>,
    /// Result of the operation that produced the event.
    #[serde(default)]
    pub payload: Option<Value>,
    /// Whether the operation failed.
    #[serde(default)]
    pub error: bool,
    /// Failure message when `error` is set.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Event {
    /// A bare event of the given kind.
    #[must_use]
    pub fn new(name: EventKind) -> Self {
        Self {
            name,
            garden: None,
            timestamp: None,
            payload_type: None,
            payload: None,
            error: false,
            error_message: None,
        }
    }

    /// Builder-style helper to attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload_type: impl Into<String>, payload: Value) -> Self {
        self.payload_type = Some(payload_type.into());
        self.payload = Some(payload);
        self
    }

    /// Builder-style helper to mark the event as a failure.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = true;
        self.error_message = Some(message.into());
        self
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
    /// Only accept events with `error` set.
    pub errors_only: bool,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            errors_only: false,
        }
    }

    /// Create a filter that only accepts failure events.
    #[must_use]
    pub fn errors() -> Self {
        Self {
            kinds: Vec::new(),
            errors_only: true,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.name);
        let error_match = !self.errors_only || event.error;

        kind_match && error_match
    }
}
