//! # Garden Configuration
//!
//! Runtime parameters, read once at startup from the environment.
//!
//! | Key | Env var | Default |
//! |-----|---------|---------|
//! | `garden.name` | `GARDEN_NAME` | `default` |
//! | `plugin.local.timeout.shutdown` | `GARDEN_PLUGIN_LOCAL_TIMEOUT_SHUTDOWN` | `10` |
//! | `plugin.local.specs` | `GARDEN_PLUGIN_LOCAL_SPECS` | unset |
//! | `event.queue.capacity` | `GARDEN_EVENT_QUEUE_CAPACITY` | `1000` |
//! | `log.level` | `GARDEN_LOG_LEVEL` / `RUST_LOG` | `info` |
//! | `log.json` | `GARDEN_JSON_LOGS` | `false` |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use garden_telemetry::TelemetryConfig;
use gd_01_systems::DEFAULT_SHUTDOWN_TIMEOUT_SECS;
use gd_02_local_plugins::PluginLaunchSpec;
use thiserror::Error;

/// Default event queue capacity.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed for its key.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The plugin spec file could not be loaded.
    #[error("Cannot load plugin specs from {path}: {reason}")]
    PluginSpecs { path: PathBuf, reason: String },
}

/// Complete garden configuration.
#[derive(Debug, Clone)]
pub struct GardenConfig {
    /// Identity stamped on every lifecycle event.
    pub garden_name: String,
    /// Bound, in seconds, on the wait for remote instances to stop.
    pub shutdown_timeout_secs: u64,
    /// JSON file holding local plugin launch specs.
    pub plugin_specs: Option<PathBuf>,
    /// Event queue capacity.
    pub event_queue_capacity: usize,
    /// Log filter directive.
    pub log_level: String,
    /// One JSON object per log line.
    pub json_logs: bool,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            garden_name: "default".to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            plugin_specs: None,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl GardenConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("GARDEN_NAME") {
            config.garden_name = name;
        }
        if let Some(value) = lookup("GARDEN_PLUGIN_LOCAL_TIMEOUT_SHUTDOWN") {
            config.shutdown_timeout_secs = parse("plugin.local.timeout.shutdown", &value)?;
        }
        if let Some(path) = lookup("GARDEN_PLUGIN_LOCAL_SPECS") {
            config.plugin_specs = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("GARDEN_EVENT_QUEUE_CAPACITY") {
            config.event_queue_capacity = parse("event.queue.capacity", &value)?;
        }
        if let Some(level) = lookup("GARDEN_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.log_level = level;
        }
        if let Some(value) = lookup("GARDEN_JSON_LOGS") {
            config.json_logs = parse_flag("log.json", &value)?;
        }

        Ok(config)
    }

    /// Look a setting up by its dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "garden.name" => Some(self.garden_name.clone()),
            "plugin.local.timeout.shutdown" => Some(self.shutdown_timeout_secs.to_string()),
            "plugin.local.specs" => self
                .plugin_specs
                .as_ref()
                .map(|path| path.display().to_string()),
            "event.queue.capacity" => Some(self.event_queue_capacity.to_string()),
            "log.level" => Some(self.log_level.clone()),
            "log.json" => Some(self.json_logs.to_string()),
            _ => None,
        }
    }

    /// Logging settings derived from this configuration.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
            ..TelemetryConfig::default()
        }
        .with_service_name(format!("garden-{}", self.garden_name))
    }

    /// Launch specs from `plugin.local.specs`; empty when unset.
    pub fn load_plugin_specs(&self) -> Result<Vec<PluginLaunchSpec>, ConfigError> {
        match &self.plugin_specs {
            Some(path) => load_specs(path),
            None => Ok(Vec::new()),
        }
    }
}

fn load_specs(path: &Path) -> Result<Vec<PluginLaunchSpec>, ConfigError> {
    let error = |reason: String| ConfigError::PluginSpecs {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| error(e.to_string()))
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
