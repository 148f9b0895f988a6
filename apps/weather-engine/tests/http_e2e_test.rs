//! HTTP E2E Tests
//!
//! Replays a JSON-lines seed into the engine, then exercises the router the
//! way a client would.

#![allow(clippy::unwrap_used, clippy::cast_possible_wrap)]

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeDelta};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use weather_engine::application::services::{EngineSettings, WeatherEngine, ingest_from};
use weather_engine::error::ErrorBody;
use weather_engine::infrastructure::http::{
    AdmitResponse, AppState, DangerZonesResponse, create_router,
};
use weather_engine::infrastructure::replay::JsonLinesSource;
use weather_engine::{DangerZoneType, ErrorCode, Regime, WeatherReport};

fn seed_file(days: i64) -> tempfile::NamedTempFile {
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# daily closes").unwrap();
    for i in 0..days {
        let price = 100.0 * 1.003_f64.powi(i as i32);
        let ts = (base + TimeDelta::days(i)).to_rfc3339();
        writeln!(
            file,
            r#"{{"symbol":"aapl","timestamp":"{ts}","price":{price},"volume":2500}}"#
        )
        .unwrap();
    }
    file
}

async fn seeded_state(days: i64) -> AppState {
    let engine = Arc::new(WeatherEngine::new(EngineSettings::default()).unwrap());
    let file = seed_file(days);
    let mut source = JsonLinesSource::open(file.path()).await.unwrap();
    let summary = ingest_from(&engine, &mut source, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.admitted, days as usize);

    AppState {
        engine,
        metrics: None,
        version: "e2e".to_string(),
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, axum::body::Bytes) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

#[tokio::test]
async fn replayed_uptrend_reports_bull_regime() {
    let app = create_router(seeded_state(60).await);

    let (status, body) = get(app, "/api/v1/weather/AAPL").await;

    assert_eq!(status, StatusCode::OK);
    let report: WeatherReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.symbol, "AAPL");
    assert_eq!(report.observation_count, 60);
    assert!(!report.analysis.insufficient_data);
    assert_eq!(report.analysis.regime, Regime::TrendingBull);
    assert!(report.danger_zones.is_empty());
}

#[tokio::test]
async fn report_wire_shape() {
    let app = create_router(seeded_state(30).await);

    let (_, body) = get(app, "/api/v1/weather/AAPL").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    for key in [
        "volatility_score",
        "momentum_score",
        "liquidity_score",
        "safety_score",
        "market_condition",
        "regime",
    ] {
        assert!(json["analysis"][key].is_number() || json["analysis"][key].is_string());
    }
    assert!(json["recommendation"]["action"].is_string());
    assert!(json["recommendation"]["confidence"].is_number());
    assert!(json["danger_zones"].is_array());
}

#[tokio::test]
async fn posted_ladder_shows_in_danger_zones() {
    let state = seeded_state(0).await;
    let app = create_router(state);

    for (secs, price) in [(1, 100.0), (2, 99.0), (3, 97.0), (4, 94.0)] {
        let ts = DateTime::from_timestamp(1_700_000_000 + secs, 0)
            .unwrap()
            .to_rfc3339();
        let body = serde_json::json!({ "timestamp": ts, "price": price });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/observations/TSLA")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let admitted: AdmitResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(admitted.outcome, "appended");
    }

    let (status, body) = get(app, "/api/v1/danger-zones/TSLA").await;

    assert_eq!(status, StatusCode::OK);
    let zones: DangerZonesResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(zones.danger_zones.len(), 1);
    assert_eq!(zones.danger_zones[0].zone_type, DangerZoneType::LadderAttack);
}

#[tokio::test]
async fn unknown_symbol_error_body() {
    let app = create_router(seeded_state(5).await);

    let (status, body) = get(app, "/api/v1/danger-zones/MSFT").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code, ErrorCode::UnknownSymbol);
}

#[tokio::test]
async fn short_history_reports_insufficient_data() {
    let app = create_router(seeded_state(10).await);

    let (status, body) = get(app, "/api/v1/weather/AAPL").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let analysis = &json["analysis"];
    assert_eq!(analysis["insufficient_data"], true);
    for key in [
        "volatility_score",
        "momentum_score",
        "liquidity_score",
        "safety_score",
    ] {
        assert_eq!(analysis[key], 50, "{key}");
    }
    assert_eq!(analysis["regime"], "undetermined");
    assert_eq!(analysis["market_condition"], "unknown");
    assert!(analysis["storm_probability"].is_null());
    assert!(analysis["vacuum_score"].is_null());
    assert!(analysis["final_risk_score"].is_null());
    assert_eq!(json["observation_count"], 10);
}
