//! # Shared Bus - Lifecycle Event Delivery
//!
//! Carries lifecycle notifications from the control plane to whoever
//! subscribes (user interfaces, federated gardens, audit sinks).
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   put()    ┌──────────────┐   drain    ┌──────────────┐
//! │  Publisher   │ ─────────→ │ Bounded queue│ ─────────→ │  Broadcast   │
//! │ (any thread) │            │              │            │ subscribers  │
//! └──────────────┘            └──────────────┘            └──────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! - The bus is constructed running (`InMemoryEventBus::start`) and injected
//!   into whatever publishes; there is no process-wide instance.
//! - `put` never waits for delivery.
//! - `shutdown` stops intake and drains the queue before returning.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{Event, EventFilter, EventKind};
pub use publisher::{EventBusError, EventManager, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer before `put` reports the queue as full.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
