//! # Garden Telemetry
//!
//! Logging and metrics for the Garden control plane.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an env filter, pretty or JSON
//! - **Metrics**: Prometheus counters in a process-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use garden_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! // Log lines and metrics are now being collected
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GARDEN_SERVICE_NAME` | `garden` | Service name in the startup line |
//! | `GARDEN_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `GARDEN_CONSOLE_OUTPUT` | `true` | Write log lines |
//! | `GARDEN_JSON_LOGS` | `false` | One JSON object per log line |

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, EVENTS_PUBLISHED,
    EVENT_PUBLISH_FAILURES, PLUGINS_KILLED, QUEUES_DELETED, REMOVAL_DURATION,
    REMOVAL_WAIT_TIMEOUTS, SYSTEMS_REMOVED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register all metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, so counters touched during startup are already registered
    let metrics_handle = register_metrics()?;

    init_logging(&config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
