//! # Event Publishing
//!
//! Every mutating systems operation announces its outcome, success or
//! failure, through [`EventPublisher`].
//!
//! ```text
//! operation ──Ok(v)──→ Event{name, payload: v}          ──put──→ EventManager
//!           ──Err(e)─→ Event{name, error, message: e}   ──put──→ EventManager
//!                      (publish failure is logged; the operation's result is returned as-is)
//! ```

use std::any::type_name;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use garden_telemetry::{EVENTS_PUBLISHED, EVENT_PUBLISH_FAILURES};
use serde::Serialize;
use shared_bus::{Event, EventBusError, EventKind, EventManager};
use tracing::{debug, error, warn};

/// Back-fills garden identity and timestamps, then hands events to the
/// injected [`EventManager`].
pub struct EventPublisher {
    garden_name: String,
    manager: Arc<dyn EventManager>,
}

impl EventPublisher {
    /// Create a publisher for the named garden.
    pub fn new(garden_name: impl Into<String>, manager: Arc<dyn EventManager>) -> Self {
        Self {
            garden_name: garden_name.into(),
            manager,
        }
    }

    /// Garden identity attached to events.
    #[must_use]
    pub fn garden_name(&self) -> &str {
        &self.garden_name
    }

    /// Fill in `garden` and `timestamp` when unset and hand the event off.
    ///
    /// Does not wait for delivery.
    pub fn publish(&self, mut event: Event) -> Result<(), EventBusError> {
        if event.garden.is_none() {
            event.garden = Some(self.garden_name.clone());
        }
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        let kind = event.name;
        let failed = if event.error { "true" } else { "false" };

        match self.manager.put(event) {
            Ok(()) => {
                EVENTS_PUBLISHED.with_label_values(&[kind.name(), failed]).inc();
                debug!(event = %kind, "Event published");
                Ok(())
            }
            Err(e) => {
                EVENT_PUBLISH_FAILURES.inc();
                Err(e)
            }
        }
    }

    /// Run `operation` and publish a `kind` event describing its outcome.
    ///
    /// On success the event carries the result as payload. On failure it
    /// carries `error = true` and the error's message. Either way the
    /// operation's own result is returned unchanged; a failed publish is
    /// only logged.
    pub async fn with_published_event<T, E, F, Fut>(
        &self,
        kind: EventKind,
        operation: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = operation().await;

        let event = match &result {
            Ok(value) => success_event(kind, value),
            Err(err) => Event::new(kind).with_error(err.to_string()),
        };

        if let Err(e) = self.publish(event) {
            error!(event = %kind, error = %e, "Failed to publish event");
        }

        result
    }
}

fn success_event<T: Serialize>(kind: EventKind, value: &T) -> Event {
    let payload_type = short_type_name(type_name::<T>());
    match serde_json::to_value(value) {
        Ok(payload) => Event::new(kind).with_payload(payload_type, payload),
        Err(e) => {
            warn!(event = %kind, error = %e, "Event payload not serializable");
            Event {
                payload_type: Some(payload_type),
                ..Event::new(kind)
            }
        }
    }
}

/// `alloc::vec::Vec<shared_types::entities::System>` → `Vec<System>`
fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}
