//! # Local Plugin Adapter
//!
//! Implements the core's `PluginManager` and `PluginRegistry` ports on top
//! of [`LocalPluginManager`]. A system counts as local exactly when a
//! launch spec is registered for it.

use std::sync::Arc;

use async_trait::async_trait;
use gd_01_systems::{PluginError, PluginHandle, PluginManager, PluginRegistry};
use gd_02_local_plugins::{LocalPluginError, LocalPluginManager, PluginLaunchSpec};
use tracing::{debug, info};

pub struct LocalPluginAdapter {
    manager: Arc<LocalPluginManager>,
}

impl LocalPluginAdapter {
    pub fn new(manager: Arc<LocalPluginManager>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<LocalPluginManager> {
        &self.manager
    }
}

fn handle_for(spec: &PluginLaunchSpec) -> PluginHandle {
    PluginHandle::new(
        spec.system_name.as_str(),
        spec.system_version.as_str(),
        spec.instance_name.as_str(),
    )
}

fn to_plugin_error(err: LocalPluginError) -> PluginError {
    match err {
        LocalPluginError::NotRegistered(name) | LocalPluginError::NotRunning(name) => {
            PluginError::NotFound(name)
        }
        LocalPluginError::NoPluginsForSystem { name, version } => {
            PluginError::SystemNotLoaded { name, version }
        }
        LocalPluginError::AlreadyRunning(name) => PluginError::Launch {
            reason: format!("{name} is already running"),
            name,
        },
    }
}

#[async_trait]
impl PluginManager for LocalPluginAdapter {
    async fn reload_system(&self, name: &str, version: &str) -> Result<(), PluginError> {
        let started = self
            .manager
            .reload_system(name, version)
            .await
            .map_err(to_plugin_error)?;
        info!(system = %name, version = %version, started, "Local plugins reloaded");
        Ok(())
    }

    async fn stop_plugin(&self, handle: &PluginHandle) -> Result<(), PluginError> {
        match self.manager.stop(&handle.unique_name).await {
            Ok(()) => Ok(()),
            Err(LocalPluginError::NotRunning(_)) => {
                debug!(plugin = %handle.unique_name, "Plugin already stopped");
                Ok(())
            }
            Err(e) => Err(to_plugin_error(e)),
        }
    }

    async fn scan_plugin_path(&self) -> Result<(), PluginError> {
        self.manager.scan();
        Ok(())
    }
}

#[async_trait]
impl PluginRegistry for LocalPluginAdapter {
    async fn plugins_for_system(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Vec<PluginHandle>, PluginError> {
        Ok(self
            .manager
            .specs_for_system(name, version)
            .iter()
            .map(handle_for)
            .collect())
    }

    async fn remove(&self, unique_name: &str) -> Result<(), PluginError> {
        self.manager
            .unregister(unique_name)
            .map(|_| ())
            .ok_or_else(|| PluginError::NotFound(unique_name.to_string()))
    }
}
