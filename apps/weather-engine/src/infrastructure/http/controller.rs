//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the weather engine.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::application::services::{WeatherEngine, WeatherReport, WindowRegistry};
use crate::domain::market_data::Observation;
use crate::error::EngineError;

use super::response::{AdmitResponse, DangerZonesResponse, HealthResponse};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The engine every handler delegates to.
    pub engine: Arc<WeatherEngine>,
    /// Prometheus handle; `/metrics` answers 503 without one.
    pub metrics: Option<PrometheusHandle>,
    /// Application version.
    pub version: String,
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/api/v1/weather/{symbol}", get(get_weather))
        .route("/api/v1/danger-zones/{symbol}", get(get_danger_zones))
        .route("/api/v1/observations/{symbol}", post(admit_observation))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        symbols: state.engine.symbols().len(),
    })
}

/// Prometheus exposition.
async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

/// Weather report endpoint.
async fn get_weather(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<WeatherReport>, EngineError> {
    state.engine.get_weather(&symbol).map(Json)
}

/// Danger zones endpoint.
async fn get_danger_zones(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<DangerZonesResponse>, EngineError> {
    let danger_zones = state.engine.get_danger_zones(&symbol)?;
    Ok(Json(DangerZonesResponse {
        symbol: WindowRegistry::normalize_symbol(&symbol),
        danger_zones,
    }))
}

/// Observation ingestion endpoint.
async fn admit_observation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    payload: Result<Json<Observation>, JsonRejection>,
) -> Result<(StatusCode, Json<AdmitResponse>), EngineError> {
    let Json(observation) = payload.map_err(|rejection| EngineError::InvalidObservation {
        symbol: WindowRegistry::normalize_symbol(&symbol),
        reason: rejection.body_text(),
    })?;
    match state.engine.admit(&symbol, observation) {
        Ok(outcome) => Ok((
            StatusCode::ACCEPTED,
            Json(AdmitResponse::new(
                WindowRegistry::normalize_symbol(&symbol),
                outcome,
            )),
        )),
        Err(e) => {
            if matches!(e, EngineError::StaleData { .. }) {
                tracing::warn!(symbol = %symbol, error = %e, "stale observation rejected");
            }
            Err(e)
        }
    }
}
