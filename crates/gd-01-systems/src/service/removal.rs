//! # Removal Protocol
//!
//! ```text
//! load ──→ local handles? ──yes──→ stop each, forget each
//!                │
//!                no ──→ publish stop ──→ wait ≤ timeout for all STOPPED (1s polls)
//!                                               │
//!        ←──────────────── reload ←─────────────┘
//!        │
//!        └──→ delete request/admin queues (force when not STOPPED) ──→ delete record
//! ```
//!
//! Only loading the system and listing its local plugins can abort the
//! removal. Stop failures, an unreachable bus and a convergence timeout are
//! logged and the protocol carries on to cleanup.

use std::sync::Arc;
use std::time::Duration;

use garden_telemetry::{
    metric_inc, time_histogram, QUEUES_DELETED, REMOVAL_DURATION, REMOVAL_WAIT_TIMEOUTS,
    SYSTEMS_REMOVED,
};
use shared_types::{System, SystemId};
use tracing::{debug, error, info, warn};

use crate::error::SystemResult;
use crate::ports::outbound::{
    MessageQueue, PluginHandle, PluginManager, PluginRegistry, QueueMessage, SystemStore,
};

/// Default bound on the convergence wait, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Delay between convergence polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Coordinates stopping, queue cleanup and deletion of a system.
pub struct RemovalCoordinator {
    store: Arc<dyn SystemStore>,
    registry: Arc<dyn PluginRegistry>,
    plugins: Arc<dyn PluginManager>,
    queue: Arc<dyn MessageQueue>,
    shutdown_timeout_secs: u64,
}

impl RemovalCoordinator {
    pub fn new(
        store: Arc<dyn SystemStore>,
        registry: Arc<dyn PluginRegistry>,
        plugins: Arc<dyn PluginManager>,
        queue: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            store,
            registry,
            plugins,
            queue,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }

    /// Set the convergence wait bound (`plugin.local.timeout.shutdown`).
    #[must_use]
    pub fn with_shutdown_timeout(mut self, seconds: u64) -> Self {
        self.shutdown_timeout_secs = seconds;
        self
    }

    #[must_use]
    pub fn shutdown_timeout_secs(&self) -> u64 {
        self.shutdown_timeout_secs
    }

    /// Remove a system and return its last snapshot.
    pub async fn remove(&self, id: &SystemId) -> SystemResult<System> {
        let system = self.store.query_unique(id).await?;
        let handles = self
            .registry
            .plugins_for_system(&system.name, &system.version)
            .await?;

        let _timer = time_histogram!(REMOVAL_DURATION);
        info!(system = %system.label(), local_plugins = handles.len(), "Removing system");

        let branch = if handles.is_empty() {
            self.stop_remote(&system).await;
            "remote"
        } else {
            self.stop_local(handles).await;
            "local"
        };

        let system = self.refresh(system).await;
        self.cleanup_queues(&system).await;

        self.store.delete(&system).await?;
        metric_inc!(SYSTEMS_REMOVED, &[branch]);
        info!(system = %system.label(), branch, "System removed");

        Ok(system)
    }

    async fn stop_local(&self, handles: Vec<PluginHandle>) {
        for handle in handles {
            if let Err(e) = self.plugins.stop_plugin(&handle).await {
                error!(plugin = %handle.unique_name, error = %e, "Failed to stop plugin");
            }
            if let Err(e) = self.registry.remove(&handle.unique_name).await {
                warn!(plugin = %handle.unique_name, error = %e, "Failed to unregister plugin");
            }
        }
    }

    async fn stop_remote(&self, system: &System) {
        let routing_key = self
            .queue
            .routing_key_for(&system.name, &system.version, true);

        if let Err(e) = self
            .queue
            .publish(QueueMessage::stop(system), &routing_key)
            .await
        {
            warn!(system = %system.label(), routing_key = %routing_key, error = %e,
                "Failed to publish stop request");
        }

        let mut current = system.clone();
        let mut waited = 0;
        while !current.all_instances_stopped() && waited < self.shutdown_timeout_secs {
            tokio::time::sleep(POLL_INTERVAL).await;
            waited += 1;

            match self.store.reload(&current).await {
                Ok(fresh) => current = fresh,
                Err(e) => {
                    warn!(system = %system.label(), error = %e,
                        "Reload failed during shutdown wait");
                    break;
                }
            }
        }

        if current.all_instances_stopped() {
            debug!(system = %system.label(), waited, "All instances stopped");
        } else {
            metric_inc!(REMOVAL_WAIT_TIMEOUTS);
            warn!(system = %system.label(), waited,
                "Instances did not stop in time; forcing cleanup");
        }
    }

    /// Latest stored state, or `system` itself when the reload fails.
    async fn refresh(&self, system: System) -> System {
        match self.store.reload(&system).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(system = %system.label(), error = %e, "Reload before cleanup failed");
                system
            }
        }
    }

    async fn cleanup_queues(&self, system: &System) {
        for instance in &system.instances {
            let force_disconnect = !instance.is_stopped();
            let queues = [
                instance.queue_info.request_queue(),
                instance.queue_info.admin_queue(),
            ];

            for name in queues.into_iter().flatten() {
                match self.queue.delete_queue(name, force_disconnect).await {
                    Ok(()) => {
                        let forced = if force_disconnect { "true" } else { "false" };
                        metric_inc!(QUEUES_DELETED, &[forced]);
                        debug!(queue = %name, force_disconnect, "Queue deleted");
                    }
                    Err(e) => {
                        warn!(queue = %name, instance = %instance.name, error = %e,
                            "Failed to delete queue");
                    }
                }
            }
        }
    }
}
