//! Prometheus metrics for the garden control plane.
//!
//! All metrics follow the naming convention: `garden_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., events_published_total)
//! - **Histogram**: Distribution of values (e.g., removal_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Events handed to the event manager
    pub static ref EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("garden_events_published_total", "Lifecycle events handed to the event manager"),
        &["event", "error"]  // error: true/false
    ).expect("metric creation failed");

    /// Events the event manager refused
    pub static ref EVENT_PUBLISH_FAILURES: Counter = Counter::new(
        "garden_event_publish_failures_total",
        "Lifecycle events that could not be handed to the event manager"
    ).expect("metric creation failed");

    // =========================================================================
    // SYSTEM METRICS
    // =========================================================================

    /// Systems removed, by shutdown branch
    pub static ref SYSTEMS_REMOVED: CounterVec = CounterVec::new(
        Opts::new("garden_systems_removed_total", "Systems removed"),
        &["branch"]  // branch: local/remote
    ).expect("metric creation failed");

    /// Convergence waits that hit the shutdown timeout
    pub static ref REMOVAL_WAIT_TIMEOUTS: Counter = Counter::new(
        "garden_removal_wait_timeouts_total",
        "Remote shutdown waits that ended on the timeout"
    ).expect("metric creation failed");

    /// Removal duration
    pub static ref REMOVAL_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "garden_removal_duration_seconds",
            "Time spent removing a system"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("bucket creation failed"))
    ).expect("metric creation failed");

    /// Queues deleted during cleanup
    pub static ref QUEUES_DELETED: CounterVec = CounterVec::new(
        Opts::new("garden_queues_deleted_total", "Queues deleted during system removal"),
        &["forced"]  // forced: true/false
    ).expect("metric creation failed");

    // =========================================================================
    // PLUGIN METRICS
    // =========================================================================

    /// Local plugin processes killed
    pub static ref PLUGINS_KILLED: Counter = Counter::new(
        "garden_plugins_killed_total",
        "Local plugin processes sent a kill signal"
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Events
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(EVENT_PUBLISH_FAILURES.clone()),
        // Systems
        Box::new(SYSTEMS_REMOVED.clone()),
        Box::new(REMOVAL_WAIT_TIMEOUTS.clone()),
        Box::new(REMOVAL_DURATION.clone()),
        Box::new(QUEUES_DELETED.clone()),
        // Plugins
        Box::new(PLUGINS_KILLED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
