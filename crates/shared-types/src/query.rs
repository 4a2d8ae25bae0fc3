//! # Search Criteria
//!
//! Criteria forwarded unmodified to the persistence layer's query engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Optional search criteria for System queries.
///
/// Every field is optional; an empty value matches everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Field equality filters, e.g. `{"name": "echo"}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_params: Option<Map<String, Value>>,
    /// Field to order by; a leading `-` sorts descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Fields to include in results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_fields: Option<Vec<String>>,
    /// Fields to exclude from results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_fields: Option<Vec<String>>,
    /// Whether nested references are resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dereference_nested: Option<bool>,
}

impl SearchParams {
    /// Criteria matching a single field value.
    #[must_use]
    pub fn filter(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut filter = Map::new();
        filter.insert(field.into(), value.into());
        Self {
            filter_params: Some(filter),
            ..Self::default()
        }
    }

    /// Builder-style helper to set ordering.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }
}
