//! # Local Plugin Manager
//!
//! Keeps the launch spec of every local plugin and the runner currently
//! started from it. A spec stays registered after its runner stops, so a
//! scan or reload can start it again.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::LocalPluginError;
use crate::runner::PluginRunner;

/// How long `stop` waits for a killed plugin's task to finish.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to start one plugin instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLaunchSpec {
    /// `name[instance]-version`
    pub unique_name: String,
    pub system_name: String,
    pub system_version: String,
    pub instance_name: String,
    /// Entry point followed by its arguments.
    pub args: Vec<String>,
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_cwd() -> PathBuf {
    PathBuf::from(".")
}

impl PluginLaunchSpec {
    pub fn new(
        system_name: impl Into<String>,
        system_version: impl Into<String>,
        instance_name: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        let system_name = system_name.into();
        let system_version = system_version.into();
        let instance_name = instance_name.into();
        Self {
            unique_name: format!("{system_name}[{instance_name}]-{system_version}"),
            system_name,
            system_version,
            instance_name,
            args,
            cwd: default_cwd(),
            env: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn belongs_to(&self, name: &str, version: &str) -> bool {
        self.system_name == name && self.system_version == version
    }
}

struct RunningPlugin {
    runner: Arc<PluginRunner>,
    task: JoinHandle<()>,
}

/// Starts, stops and tracks local plugin processes.
pub struct LocalPluginManager {
    specs: RwLock<BTreeMap<String, PluginLaunchSpec>>,
    running: Mutex<HashMap<String, RunningPlugin>>,
    stop_timeout: Duration,
}

impl Default for LocalPluginManager {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_TIMEOUT)
    }
}

impl LocalPluginManager {
    pub fn new(stop_timeout: Duration) -> Self {
        Self {
            specs: RwLock::new(BTreeMap::new()),
            running: Mutex::new(HashMap::new()),
            stop_timeout,
        }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register (or replace) a launch spec. Does not start anything.
    pub fn register(&self, spec: PluginLaunchSpec) {
        debug!(plugin = %spec.unique_name, "Plugin registered");
        self.specs.write().insert(spec.unique_name.clone(), spec);
    }

    /// Forget a launch spec. A running runner is left alone.
    pub fn unregister(&self, unique_name: &str) -> Option<PluginLaunchSpec> {
        self.specs.write().remove(unique_name)
    }

    #[must_use]
    pub fn spec(&self, unique_name: &str) -> Option<PluginLaunchSpec> {
        self.specs.read().get(unique_name).cloned()
    }

    /// Registered specs belonging to a system.
    #[must_use]
    pub fn specs_for_system(&self, name: &str, version: &str) -> Vec<PluginLaunchSpec> {
        self.specs
            .read()
            .values()
            .filter(|spec| spec.belongs_to(name, version))
            .cloned()
            .collect()
    }

    // =========================================================================
    // RUNNERS
    // =========================================================================

    #[must_use]
    pub fn runner(&self, unique_name: &str) -> Option<Arc<PluginRunner>> {
        self.running
            .lock()
            .get(unique_name)
            .map(|running| running.runner.clone())
    }

    /// Names of plugins whose process is alive.
    #[must_use]
    pub fn running_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .running
            .lock()
            .iter()
            .filter(|(_, running)| running.runner.is_running())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Start a registered plugin on its own task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn launch(&self, unique_name: &str) -> Result<Arc<PluginRunner>, LocalPluginError> {
        let spec = self
            .spec(unique_name)
            .ok_or_else(|| LocalPluginError::NotRegistered(unique_name.to_string()))?;

        let mut running = self.running.lock();
        if let Some(existing) = running.get(unique_name) {
            if !existing.task.is_finished() {
                return Err(LocalPluginError::AlreadyRunning(unique_name.to_string()));
            }
        }

        let runner = Arc::new(PluginRunner::new(
            spec.unique_name.clone(),
            spec.args,
            spec.cwd,
            spec.env,
        ));
        let task = tokio::spawn({
            let runner = runner.clone();
            async move { runner.start().await }
        });

        info!(plugin = %unique_name, "Plugin launched");
        running.insert(
            unique_name.to_string(),
            RunningPlugin {
                runner: runner.clone(),
                task,
            },
        );
        Ok(runner)
    }

    /// Kill a plugin and wait, up to the stop timeout, for its task to end.
    ///
    /// A plugin launched moments ago is given the same timeout to spawn
    /// before it is killed.
    pub async fn stop(&self, unique_name: &str) -> Result<(), LocalPluginError> {
        let entry = self
            .running
            .lock()
            .remove(unique_name)
            .ok_or_else(|| LocalPluginError::NotRunning(unique_name.to_string()))?;
        let RunningPlugin { runner, task } = entry;

        let abort = task.abort_handle();
        let stopped = tokio::time::timeout(self.stop_timeout, async {
            runner.wait_started().await;
            runner.kill();
            task.await
        })
        .await;

        match stopped {
            Ok(Ok(())) => debug!(plugin = %unique_name, "Plugin stopped"),
            Ok(Err(e)) => {
                warn!(plugin = %unique_name, error = %e, "Plugin task failed");
                runner.mark_abandoned();
            }
            Err(_) => {
                // Dropping the task's future drops the child, which kills it.
                warn!(plugin = %unique_name, timeout = ?self.stop_timeout,
                    "Plugin did not stop in time; abandoning it");
                abort.abort();
                runner.mark_abandoned();
            }
        }
        Ok(())
    }

    /// Restart every local plugin of a system.
    ///
    /// Returns the number of plugins started.
    pub async fn reload_system(
        &self,
        name: &str,
        version: &str,
    ) -> Result<usize, LocalPluginError> {
        let specs = self.specs_for_system(name, version);
        if specs.is_empty() {
            return Err(LocalPluginError::NoPluginsForSystem {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        info!(system = %name, version = %version, plugins = specs.len(), "Reloading local plugins");
        for spec in &specs {
            match self.stop(&spec.unique_name).await {
                Ok(()) | Err(LocalPluginError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
            self.launch(&spec.unique_name)?;
        }
        Ok(specs.len())
    }

    /// Start every registered plugin that is not running.
    ///
    /// Returns the names of the plugins started.
    pub fn scan(&self) -> Vec<String> {
        let names: Vec<String> = self.specs.read().keys().cloned().collect();

        let mut launched = Vec::new();
        for name in names {
            match self.launch(&name) {
                Ok(_) => launched.push(name),
                Err(LocalPluginError::AlreadyRunning(_)) => {}
                Err(e) => warn!(plugin = %name, error = %e, "Scan could not start plugin"),
            }
        }

        info!(started = launched.len(), "Plugin scan complete");
        launched
    }

    /// Stop everything. Used on shutdown.
    pub async fn stop_all(&self) {
        let names: Vec<String> = self.running.lock().keys().cloned().collect();
        for name in names {
            if let Err(e) = self.stop(&name).await {
                debug!(plugin = %name, error = %e, "Stop skipped");
            }
        }
    }
}
