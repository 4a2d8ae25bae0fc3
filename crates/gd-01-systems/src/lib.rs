//! # gd-01-systems
//!
//! System lifecycle subsystem of the Garden control plane.
//!
//! ## Overview
//!
//! This subsystem provides:
//! - **Routing**: validates CREATE / READ / UPDATE / DELETE requests and dispatches them
//! - **Registry**: System CRUD and the sequential patch state machine
//! - **Removal**: local stop or remote stop + bounded convergence wait, then forced queue cleanup
//! - **Events**: a lifecycle event for every mutation, success or failure
//!
//! ## Architecture
//!
//! ```text
//! caller ──→ Router ──→ SystemRegistry ──→ SystemStore
//!                           │    │
//!                           │    └──→ EventPublisher ──→ EventManager
//!                           │
//!                           └──→ RemovalCoordinator ──→ PluginRegistry / PluginManager
//!                                                  └──→ MessageQueue
//! ```
//!
//! ## Error Taxonomy
//!
//! | Error | Cause |
//! |-------|-------|
//! | `RoutingRequest` | Missing id or payload, unknown route kind |
//! | `Validation` | Unsupported patch, command conflict, instance limit |
//! | `NotFound` | Unknown system id |
//!
//! Plugin supervision and event publishing failures are logged, never returned.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gd_01_systems::{EventPublisher, RemovalCoordinator, Router, SystemRegistry};
//!
//! let events = Arc::new(EventPublisher::new("default", bus));
//! let removal = RemovalCoordinator::new(store.clone(), registry, plugins.clone(), queue)
//!     .with_shutdown_timeout(10);
//! let router = Router::new(Arc::new(SystemRegistry::new(store, plugins, events, removal)));
//!
//! let created = router.route(RouteRequest::new(RouteKind::Create)
//!     .with_payload(RoutePayload::System(system))).await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod domain;
pub mod error;
pub mod events;
pub mod ports;
pub mod router;
pub mod service;

pub use error::{SystemError, SystemResult};
pub use events::EventPublisher;
pub use ports::inbound::SystemApi;
pub use ports::outbound::{
    CommandType, MessageQueue, PluginError, PluginHandle, PluginManager, PluginRegistry,
    QueueError, QueueMessage, SystemStore,
};
pub use router::{Operation, RouteKind, RoutePayload, RouteRequest, RouteResponse, Router};
pub use service::{RemovalCoordinator, SystemRegistry, DEFAULT_SHUTDOWN_TIMEOUT_SECS};
