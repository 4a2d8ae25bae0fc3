//! # Garden Container
//!
//! Holds the collaborators of the systems core and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: Event bus, EventPublisher (garden.name)
//! Phase 2: Store, queue, local plugin manager (+ launch specs)
//! Phase 3: RemovalCoordinator (plugin.local.timeout.shutdown), SystemRegistry, Router
//! ```
//!
//! Must be built inside a tokio runtime: the event bus spawns its drain task.

pub mod config;

pub use config::{ConfigError, GardenConfig, DEFAULT_EVENT_QUEUE_CAPACITY};

use std::sync::Arc;

use gd_01_systems::{EventPublisher, RemovalCoordinator, Router, SystemRegistry};
use gd_02_local_plugins::LocalPluginManager;
use shared_bus::InMemoryEventBus;
use tracing::{info, instrument};

use crate::adapters::{InMemoryQueue, InMemorySystemStore, LocalPluginAdapter};

/// Every long-lived component of a garden.
pub struct GardenContainer {
    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    /// Lifecycle event sink.
    pub event_bus: Arc<InMemoryEventBus>,

    /// Stamps and publishes lifecycle events.
    pub events: Arc<EventPublisher>,

    // =========================================================================
    // COLLABORATORS
    // =========================================================================
    pub store: Arc<InMemorySystemStore>,

    pub queue: Arc<InMemoryQueue>,

    /// Local plugin processes.
    pub plugins: Arc<LocalPluginManager>,

    // =========================================================================
    // CORE
    // =========================================================================
    pub router: Router,

    /// Garden configuration (immutable after initialization).
    pub config: GardenConfig,
}

impl GardenContainer {
    #[instrument(name = "garden_init", skip(config), fields(garden = %config.garden_name))]
    pub fn new(config: GardenConfig) -> Result<Self, ConfigError> {
        info!("Phase 1: Creating shared infrastructure");
        let event_bus = InMemoryEventBus::start_with_capacity(config.event_queue_capacity);
        let events = Arc::new(EventPublisher::new(
            config.garden_name.clone(),
            event_bus.clone(),
        ));

        info!("Phase 2: Creating collaborators");
        let store = Arc::new(InMemorySystemStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let plugins = Arc::new(LocalPluginManager::default());
        for spec in config.load_plugin_specs()? {
            plugins.register(spec);
        }
        let adapter = Arc::new(LocalPluginAdapter::new(plugins.clone()));

        info!("Phase 3: Wiring the systems core");
        let removal =
            RemovalCoordinator::new(store.clone(), adapter.clone(), adapter.clone(), queue.clone())
                .with_shutdown_timeout(config.shutdown_timeout_secs);
        let registry = SystemRegistry::new(store.clone(), adapter, events.clone(), removal);
        let router = Router::new(Arc::new(registry));

        Ok(Self {
            event_bus,
            events,
            store,
            queue,
            plugins,
            router,
            config,
        })
    }
}
