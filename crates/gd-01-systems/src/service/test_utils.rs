//! Recording mocks for the outbound ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{Event, EventBusError, EventManager};
use shared_types::{
    Command, InstanceStatus, SearchParams, StoreError, System, SystemId,
};

use crate::ports::outbound::{
    MessageQueue, PluginError, PluginHandle, PluginManager, PluginRegistry, QueueError,
    QueueMessage, SystemStore,
};

// =============================================================================
// STORE
// =============================================================================

#[derive(Default)]
pub struct MockStore {
    systems: Mutex<HashMap<SystemId, System>>,
    calls: Mutex<Vec<&'static str>>,
    last_query: Mutex<Option<SearchParams>>,
    reloads: AtomicUsize,
    stop_after_reloads: Mutex<Option<usize>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a system, assigning an id when it has none.
    pub fn insert(&self, mut system: System) -> SystemId {
        let id = system.id.clone().unwrap_or_else(SystemId::generate);
        system.id = Some(id.clone());
        self.systems.lock().insert(id.clone(), system);
        id
    }

    pub fn get(&self, id: &SystemId) -> Option<System> {
        self.systems.lock().get(id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.lock().is_empty()
    }

    /// Mutating calls, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn last_query(&self) -> Option<SearchParams> {
        self.last_query.lock().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// From the `n`th reload on, every stored instance reports `STOPPED`.
    pub fn stop_instances_after_reloads(&self, n: usize) {
        *self.stop_after_reloads.lock() = Some(n);
    }

    fn save(&self, call: &'static str, mut system: System) -> System {
        self.calls.lock().push(call);
        let id = system.id.clone().unwrap_or_else(SystemId::generate);
        system.id = Some(id.clone());
        self.systems.lock().insert(id, system.clone());
        system
    }

    fn require_id(system: &System) -> Result<SystemId, StoreError> {
        system
            .id
            .clone()
            .ok_or_else(|| StoreError::Backend("system has no id".into()))
    }
}

#[async_trait]
impl SystemStore for MockStore {
    async fn query_unique(&self, id: &SystemId) -> Result<System, StoreError> {
        self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn query(&self, params: &SearchParams) -> Result<Vec<System>, StoreError> {
        *self.last_query.lock() = Some(params.clone());
        let mut systems: Vec<System> = self.systems.lock().values().cloned().collect();
        systems.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(systems)
    }

    async fn create(&self, system: System) -> Result<System, StoreError> {
        Ok(self.save("create", system))
    }

    async fn update(&self, system: System) -> Result<System, StoreError> {
        let id = Self::require_id(&system)?;
        if self.get(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        Ok(self.save("update", system))
    }

    async fn delete(&self, system: &System) -> Result<(), StoreError> {
        let id = Self::require_id(system)?;
        self.calls.lock().push("delete");
        self.systems
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn reload(&self, system: &System) -> Result<System, StoreError> {
        let id = Self::require_id(system)?;
        let count = self.reloads.fetch_add(1, Ordering::SeqCst) + 1;

        let mut systems = self.systems.lock();
        let stored = systems
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if matches!(*self.stop_after_reloads.lock(), Some(n) if count >= n) {
            for instance in &mut stored.instances {
                instance.status = InstanceStatus::Stopped;
            }
        }
        Ok(stored.clone())
    }

    async fn replace_commands(
        &self,
        mut system: System,
        commands: Vec<Command>,
    ) -> Result<System, StoreError> {
        system.commands = commands;
        Ok(self.save("replace_commands", system))
    }
}

// =============================================================================
// MESSAGE BUS
// =============================================================================

#[derive(Default)]
pub struct MockQueue {
    published: Mutex<Vec<(QueueMessage, String)>>,
    deleted: Mutex<Vec<(String, bool)>>,
    fail: bool,
}

impl MockQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn published(&self) -> Vec<(QueueMessage, String)> {
        self.published.lock().clone()
    }

    pub fn deleted(&self) -> Vec<(String, bool)> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl MessageQueue for MockQueue {
    async fn publish(&self, message: QueueMessage, routing_key: &str) -> Result<(), QueueError> {
        if self.fail {
            return Err(QueueError::Connection("broker down".into()));
        }
        self.published.lock().push((message, routing_key.to_string()));
        Ok(())
    }

    async fn delete_queue(&self, name: &str, force_disconnect: bool) -> Result<(), QueueError> {
        if self.fail {
            return Err(QueueError::QueueNotFound(name.to_string()));
        }
        self.deleted.lock().push((name.to_string(), force_disconnect));
        Ok(())
    }
}

// =============================================================================
// PLUGINS
// =============================================================================

#[derive(Default)]
pub struct MockPluginRegistry {
    handles: Mutex<Vec<PluginHandle>>,
    removed: Mutex<Vec<String>>,
}

impl MockPluginRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_handles(handles: Vec<PluginHandle>) -> Arc<Self> {
        Arc::new(Self {
            handles: Mutex::new(handles),
            ..Self::default()
        })
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl PluginRegistry for MockPluginRegistry {
    async fn plugins_for_system(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<PluginHandle>, PluginError> {
        Ok(self
            .handles
            .lock()
            .iter()
            .filter(|h| h.belongs_to(name, version))
            .cloned()
            .collect())
    }

    async fn remove(&self, unique_name: &str) -> Result<(), PluginError> {
        self.handles.lock().retain(|h| h.unique_name != unique_name);
        self.removed.lock().push(unique_name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPluginManager {
    stopped: Mutex<Vec<String>>,
    reloaded: Mutex<Vec<(String, String)>>,
    scans: AtomicUsize,
    fail_stop_for: Option<String>,
}

impl MockPluginManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `stop_plugin` fails for the named plugin (the attempt is still recorded).
    pub fn failing_stop_for(unique_name: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_stop_for: Some(unique_name.to_string()),
            ..Self::default()
        })
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().clone()
    }

    pub fn reloaded(&self) -> Vec<(String, String)> {
        self.reloaded.lock().clone()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginManager for MockPluginManager {
    async fn reload_system(&self, name: &str, version: &str) -> Result<(), PluginError> {
        self.reloaded
            .lock()
            .push((name.to_string(), version.to_string()));
        Ok(())
    }

    async fn stop_plugin(&self, handle: &PluginHandle) -> Result<(), PluginError> {
        self.stopped.lock().push(handle.unique_name.clone());
        if self.fail_stop_for.as_deref() == Some(handle.unique_name.as_str()) {
            return Err(PluginError::NotFound(handle.unique_name.clone()));
        }
        Ok(())
    }

    async fn scan_plugin_path(&self) -> Result<(), PluginError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// EVENTS
// =============================================================================

#[derive(Default)]
pub struct MockEventManager {
    events: Mutex<Vec<Event>>,
}

impl MockEventManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventManager for MockEventManager {
    fn put(&self, event: Event) -> Result<(), EventBusError> {
        self.events.lock().push(event);
        Ok(())
    }
}
