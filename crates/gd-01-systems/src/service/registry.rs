//! System registry: CRUD and the patch state machine.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared_bus::EventKind;
use shared_types::{Command, Instance, PatchKind, PatchOperation, SearchParams, System, SystemId};
use tracing::{debug, info};

use crate::domain::{
    apply_create_defaults, check_command_replacement, check_instance_limit, merge_metadata,
    replace_setter, text_value,
};
use crate::error::{SystemError, SystemResult};
use crate::events::EventPublisher;
use crate::ports::inbound::SystemApi;
use crate::ports::outbound::{PluginManager, SystemStore};
use crate::service::removal::RemovalCoordinator;

/// Owns every System mutation.
///
/// Performs no locking of its own; each store call is atomic per record
/// and nothing more.
pub struct SystemRegistry {
    store: Arc<dyn SystemStore>,
    plugins: Arc<dyn PluginManager>,
    events: Arc<EventPublisher>,
    removal: RemovalCoordinator,
}

impl SystemRegistry {
    pub fn new(
        store: Arc<dyn SystemStore>,
        plugins: Arc<dyn PluginManager>,
        events: Arc<EventPublisher>,
        removal: RemovalCoordinator,
    ) -> Self {
        Self {
            store,
            plugins,
            events,
            removal,
        }
    }

    async fn create_system(&self, system: System) -> SystemResult<System> {
        let system = apply_create_defaults(system)?;
        let created = self.store.create(system).await?;
        info!(system = %created.label(), instances = created.instances.len(), "System created");
        Ok(created)
    }

    async fn apply_operations(
        &self,
        id: &SystemId,
        operations: Vec<PatchOperation>,
    ) -> SystemResult<System> {
        let mut system = self.store.query_unique(id).await?;
        for operation in operations {
            system = self.apply_operation(id, system, operation).await?;
        }
        Ok(system)
    }

    /// Apply one operation and commit it.
    async fn apply_operation(
        &self,
        id: &SystemId,
        mut system: System,
        op: PatchOperation,
    ) -> SystemResult<System> {
        debug!(system = %system.label(), operation = %op.operation, path = %op.path,
            "Applying patch");

        match (&op.operation, op.path.as_str()) {
            (PatchKind::Replace, "/commands") => {
                let commands: Vec<Command> = parse_value(&op.path, op.value)?;
                check_command_replacement(&system, &commands)?;
                Ok(self.store.replace_commands(system, commands).await?)
            }
            (PatchKind::Replace, path) => match replace_setter(path) {
                Some(setter) => {
                    setter(&mut system, text_value(path, op.value)?);
                    Ok(self.store.update(system).await?)
                }
                None => Err(unsupported(&op)),
            },
            (PatchKind::Add, "/instance") => {
                let instance: Instance = parse_value(&op.path, op.value)?;
                check_instance_limit(&system, &instance.name)?;
                system.instances.push(instance);
                Ok(self.store.create(system).await?)
            }
            (PatchKind::Update, "/metadata") => {
                merge_metadata(&mut system.metadata, op.value)?;
                Ok(self.store.update(system).await?)
            }
            (PatchKind::Reload, _) => self.reload_system(id).await,
            _ => Err(unsupported(&op)),
        }
    }

    async fn reload_system(&self, id: &SystemId) -> SystemResult<System> {
        let system = self.store.query_unique(id).await?;

        info!(system = %system.name, version = %system.version, "Reloading system");
        self.plugins
            .reload_system(&system.name, &system.version)
            .await?;

        Ok(self.store.update(system).await?)
    }
}

fn parse_value<T: DeserializeOwned>(path: &str, value: Value) -> SystemResult<T> {
    serde_json::from_value(value)
        .map_err(|e| SystemError::Validation(format!("Invalid value for '{path}': {e}")))
}

fn unsupported(op: &PatchOperation) -> SystemError {
    match op.operation {
        PatchKind::Replace | PatchKind::Add | PatchKind::Update => SystemError::Validation(
            format!("Unsupported path for {} '{}'", op.operation, op.path),
        ),
        _ => SystemError::Validation(format!(
            "Unsupported operation '{}' on path '{}'",
            op.operation, op.path
        )),
    }
}

#[async_trait]
impl SystemApi for SystemRegistry {
    async fn get_one(&self, id: &SystemId) -> SystemResult<System> {
        Ok(self.store.query_unique(id).await?)
    }

    async fn search(&self, params: SearchParams) -> SystemResult<Vec<System>> {
        Ok(self.store.query(&params).await?)
    }

    async fn create(&self, system: System) -> SystemResult<System> {
        self.events
            .with_published_event(EventKind::SystemCreated, || self.create_system(system))
            .await
    }

    async fn patch(&self, id: &SystemId, operations: Vec<PatchOperation>) -> SystemResult<System> {
        self.events
            .with_published_event(EventKind::SystemUpdated, || {
                self.apply_operations(id, operations)
            })
            .await
    }

    async fn reload(&self, id: &SystemId) -> SystemResult<System> {
        self.reload_system(id).await
    }

    async fn rescan(&self, operations: Vec<PatchOperation>) -> SystemResult<()> {
        for op in operations {
            if op.operation != PatchKind::Rescan {
                return Err(SystemError::Validation(format!(
                    "Unsupported operation '{}'",
                    op.operation
                )));
            }
            info!("Rescanning plugin directory");
            self.plugins.scan_plugin_path().await?;
        }
        Ok(())
    }

    async fn remove(&self, id: &SystemId) -> SystemResult<System> {
        self.events
            .with_published_event(EventKind::SystemRemoved, || self.removal.remove(id))
            .await
    }
}
