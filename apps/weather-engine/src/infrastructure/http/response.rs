//! HTTP response DTOs.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::danger::DangerZone;
use crate::domain::market_data::AdmitOutcome;
use crate::error::{EngineError, ErrorBody};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Number of symbols with a market data window.
    pub symbols: usize,
}

/// Response to an accepted observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitResponse {
    /// Normalized symbol the observation was stored under.
    pub symbol: String,
    /// `appended` or `replaced`.
    pub outcome: String,
    /// Older entries dropped by retention or capacity.
    pub evicted: usize,
}

impl AdmitResponse {
    /// Build from an admission outcome.
    pub fn new(symbol: String, outcome: AdmitOutcome) -> Self {
        let (outcome, evicted) = match outcome {
            AdmitOutcome::Appended { evicted } => ("appended", evicted),
            AdmitOutcome::Replaced => ("replaced", 0),
        };
        Self {
            symbol,
            outcome: outcome.to_string(),
            evicted,
        }
    }
}

/// Danger zones for one symbol, most relevant first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerZonesResponse {
    /// Requested symbol.
    pub symbol: String,
    /// Ranked zones; empty when none are detected.
    pub danger_zones: Vec<DangerZone>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        (self.code().http_status(), Json(ErrorBody::from(&self))).into_response()
    }
}
