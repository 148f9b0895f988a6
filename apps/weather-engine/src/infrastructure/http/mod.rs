//! HTTP Adapter (Driver)
//!
//! Thin axum surface over [`crate::application::services::WeatherEngine`]:
//! weather and danger-zone queries, observation ingestion, health and
//! Prometheus exposition.

mod controller;
mod response;

pub use controller::{AppState, create_router};
pub use response::*;
