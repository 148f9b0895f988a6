// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_wrap
    )
)]

//! Weather Engine - Market Regime & Risk Scoring
//!
//! Turns a stream of price/volume observations into a "market weather"
//! report per symbol: feature scores, a regime label and weather
//! condition, ranked danger zones and a BUY/SELL/HOLD recommendation.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: deterministic analytics, no I/O
//!   - `market_data`: observations and per-symbol bounded windows
//!   - `features`: volatility, momentum, liquidity, safety, storm probability
//!   - `regime`: regime and weather-condition classification
//!   - `danger`: ladder-attack, gamma-exposure and liquidity-vacuum zones
//!   - `recommendation`: BUY/SELL/HOLD aggregation
//!
//! - **Application**: orchestration
//!   - `ports`: `ObservationSource` for feed collaborators
//!   - `services`: `WeatherEngine`, `WindowRegistry`, report assembly, ingestion
//!
//! - **Infrastructure**: adapters
//!   - `http`: axum REST surface
//!   - `replay`: JSON-lines observation source
//!
//! Configuration, metrics and tracing live in [`config`], [`observability`]
//! and [`telemetry`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Deterministic analytics with no I/O.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error taxonomy and wire error codes.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Tracing and OpenTelemetry setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::danger::{DangerZone, DangerZoneType};
pub use domain::features::{FeatureVector, VolatilityConvention};
pub use domain::market_data::{AdmitOutcome, Lookback, Observation, StrikeInterest};
pub use domain::recommendation::{Action, Recommendation};
pub use domain::regime::{MarketCondition, Regime};

// Application re-exports
pub use application::ports::{FeedRecord, ObservationSource, SourceError};
pub use application::services::{EngineSettings, WeatherEngine, WeatherReport, ingest_from};

// Infrastructure re-exports
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::replay::JsonLinesSource;

pub use error::{EngineError, ErrorCode};
