//! # Garden Runtime
//!
//! Runs one garden: the systems core, its collaborators and the local
//! plugins, behind a JSON-lines operation shell.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and wiring of the core's collaborators
//! - `adapters/` - Port implementations for the systems core
//! - `shell` - JSON-lines operation loop
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize telemetry
//! 3. Build the container (event bus first, core last)
//! 4. Publish `GARDEN_STARTED` and start registered local plugins
//! 5. Serve operations until stdin closes or Ctrl+C
//!
//! ## Shutdown Sequence
//!
//! 1. Publish `GARDEN_STOPPED`
//! 2. Stop every local plugin
//! 3. Drain the event bus

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod shell;

use std::sync::Arc;

use gd_01_systems::Router;
use shared_bus::{Event, EventKind};
use tracing::{info, warn};

pub use container::{ConfigError, GardenConfig, GardenContainer};
pub use shell::{handle_line, run_shell};

/// A running garden.
pub struct GardenRuntime {
    container: Arc<GardenContainer>,
}

impl GardenRuntime {
    pub fn new(config: GardenConfig) -> Result<Self, ConfigError> {
        info!(garden = %config.garden_name, "Creating garden runtime");
        let container = Arc::new(GardenContainer::new(config)?);
        Ok(Self { container })
    }

    /// Announce the garden and start its local plugins.
    pub fn start(&self) {
        info!("===========================================");
        info!("  Garden Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Garden: {}", self.container.config.garden_name);
        info!("===========================================");

        self.publish(EventKind::GardenStarted);

        let launched = self.container.plugins.scan();
        info!(plugins = launched.len(), "Local plugins started");
    }

    /// Stop local plugins and drain pending events.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        self.publish(EventKind::GardenStopped);
        self.container.plugins.stop_all().await;
        self.container.event_bus.shutdown().await;

        info!("Shutdown complete");
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.container.router
    }

    #[must_use]
    pub fn container(&self) -> Arc<GardenContainer> {
        Arc::clone(&self.container)
    }

    fn publish(&self, kind: EventKind) {
        if let Err(e) = self.container.events.publish(Event::new(kind)) {
            warn!(event = %kind.name(), error = %e, "Failed to publish garden event");
        }
    }
}
