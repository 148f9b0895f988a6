//! Observability module for metrics.
//!
//! Tracing subscriber setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_danger_zone, record_observation_admitted,
    record_observation_rejected, record_report, update_tracked_symbols,
};
