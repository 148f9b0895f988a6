//! Prometheus metrics for the weather engine.
//!
//! The recorder is installed once at startup; the returned handle renders
//! the exposition text served at `GET /metrics`.
//!
//! # Example
//!
//! ```ignore
//! use weather_engine::observability::{init_metrics, MetricsConfig};
//!
//! let handle = init_metrics(&MetricsConfig::default())?;
//! record_observation_admitted();
//! let text = handle.render();
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const REPORT_SECONDS: &str = "weather_engine_report_seconds";

/// Configuration for the metrics recorder.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Histogram buckets for report assembly latency (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            // 10us to 250ms
            latency_buckets: vec![
                0.000_01, 0.000_05, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25,
            ],
        }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure the recorder.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install the recorder.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus recorder globally.
///
/// # Errors
///
/// Returns an error if the buckets are invalid or a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REPORT_SECONDS.to_string()),
            &config.latency_buckets,
        )
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

// ============================================================================
// Ingestion
// ============================================================================

/// Record an admitted observation.
pub fn record_observation_admitted() {
    counter!("weather_engine_observations_admitted_total").increment(1);
}

/// Record a rejected observation.
///
/// * `reason` - Error code (e.g., `STALE_DATA`, `INVALID_OBSERVATION`)
pub fn record_observation_rejected(reason: &str) {
    counter!(
        "weather_engine_observations_rejected_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Update the number of symbols with a window.
#[allow(clippy::cast_precision_loss)]
pub fn update_tracked_symbols(count: usize) {
    gauge!("weather_engine_tracked_symbols").set(count as f64);
}

// ============================================================================
// Reports
// ============================================================================

/// Record an assembled weather report.
pub fn record_report(condition: &str, latency_seconds: f64) {
    counter!(
        "weather_engine_reports_total",
        "condition" => condition.to_string()
    )
    .increment(1);

    histogram!(REPORT_SECONDS).record(latency_seconds);
}

/// Record danger zones surfaced in a report.
pub fn record_danger_zone(zone_type: &str) {
    counter!(
        "weather_engine_danger_zones_total",
        "type" => zone_type.to_string()
    )
    .increment(1);
}
