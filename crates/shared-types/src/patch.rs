//! # Patch Operations
//!
//! Declarative mutations applied to a System, one at a time.
//!
//! Wire shape: `{"operation": "replace", "path": "/description", "value": ...}`.
//! Unrecognised operation names are preserved so the rejection can name them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PatchKind {
    /// Replace a field.
    Replace,
    /// Add an element to a collection.
    Add,
    /// Merge into a mapping.
    Update,
    /// Reload the system from its live process.
    Reload,
    /// Rescan the plugin directory.
    Rescan,
    /// Anything else, kept verbatim.
    Other(String),
}

impl PatchKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Update => "update",
            Self::Reload => "reload",
            Self::Rescan => "rescan",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for PatchKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "replace" => Self::Replace,
            "add" => Self::Add,
            "update" => Self::Update,
            "reload" => Self::Reload,
            "rescan" => Self::Rescan,
            _ => Self::Other(value),
        }
    }
}

impl From<PatchKind> for String {
    fn from(value: PatchKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single patch instruction. Transient: consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// What to do.
    pub operation: PatchKind,
    /// Where to do it, e.g. `/commands`.
    #[serde(default)]
    pub path: String,
    /// Operand; `null` when absent.
    #[serde(default)]
    pub value: Value,
}

impl PatchOperation {
    /// Build an operation.
    #[must_use]
    pub fn new(operation: PatchKind, path: impl Into<String>, value: Value) -> Self {
        Self {
            operation,
            path: path.into(),
            value,
        }
    }

    /// `replace` at `path`.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchKind::Replace, path, value)
    }

    /// `add` at `path`.
    #[must_use]
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchKind::Add, path, value)
    }

    /// `update` at `path`.
    #[must_use]
    pub fn update(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchKind::Update, path, value)
    }

    /// `reload` (no path or value).
    #[must_use]
    pub fn reload() -> Self {
        Self::new(PatchKind::Reload, "", Value::Null)
    }

    /// `rescan` (no path or value).
    #[must_use]
    pub fn rescan() -> Self {
        Self::new(PatchKind::Rescan, "", Value::Null)
    }
}
