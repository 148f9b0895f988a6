//! Weather Report Assembler.
//!
//! Composes features, labels, recommendation and zones into the wire
//! contract. Scores are rounded to integers here and nowhere else.
//!
//! Assembly fails closed: when the features were computed on insufficient
//! data the report always carries the flag, an `undetermined` regime, an
//! `unknown` condition and a zero-confidence HOLD, whatever the inputs say.
//!
//! The final risk score blends the tail-loss and liquidity signals with the
//! strongest danger zone: `0.4 * storm + 0.3 * vacuum + 0.3 * top_zone`,
//! missing components counting as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::danger::DangerZone;
use crate::domain::features::{FeatureReport, VolatilityConvention};
use crate::domain::market_data::WindowSnapshot;
use crate::domain::recommendation::Recommendation;
use crate::domain::regime::{MarketCondition, Regime};
use crate::error::EngineError;

const STORM_RISK_WEIGHT: f64 = 0.4;
const VACUUM_RISK_WEIGHT: f64 = 0.3;
const ZONE_RISK_WEIGHT: f64 = 0.3;

/// Everything derived from one snapshot, before rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// Feature scores and diagnostics.
    pub features: FeatureReport,
    /// Regime label.
    pub regime: Regime,
    /// Weather label.
    pub condition: MarketCondition,
    /// Recommended action.
    pub recommendation: Recommendation,
    /// Ranked danger zones.
    pub danger_zones: Vec<DangerZone>,
    /// Liquidity-vacuum score in `[0, 1]`, emitted or not.
    pub vacuum_score: Option<f64>,
}

/// The `analysis` block of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Volatility score in the configured convention.
    pub volatility_score: u8,
    /// Momentum score, 50 = neutral.
    pub momentum_score: u8,
    /// Liquidity score.
    pub liquidity_score: u8,
    /// Safety score.
    pub safety_score: u8,
    /// Weather label.
    pub market_condition: MarketCondition,
    /// Regime label.
    pub regime: Regime,
    /// Scores are neutral placeholders; too few observations.
    pub insufficient_data: bool,
    /// Probability of a storm-sized loss over the storm horizon.
    pub storm_probability: Option<f64>,
    /// Liquidity-vacuum score in `[0, 1]`.
    pub vacuum_score: Option<f64>,
    /// Combined storm, vacuum and danger-zone risk in `[0, 1]`.
    pub final_risk_score: Option<f64>,
}

/// Externally visible weather report. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Instrument symbol.
    pub symbol: String,
    /// Latest observed price.
    pub price: f64,
    /// Timestamp of the latest observation.
    pub as_of: DateTime<Utc>,
    /// Observations the report was computed from.
    pub observation_count: usize,
    /// Scores and labels.
    pub analysis: Analysis,
    /// Recommended action.
    pub recommendation: Recommendation,
    /// Ranked danger zones.
    pub danger_zones: Vec<DangerZone>,
}

/// Round a score for the wire.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wire_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Weighted blend of storm probability, vacuum score and the strongest
/// zone's confidence, clamped to `[0, 1]`.
#[must_use]
pub fn final_risk_score(
    storm_probability: Option<f64>,
    vacuum_score: Option<f64>,
    danger_zones: &[DangerZone],
) -> f64 {
    let top_zone = danger_zones
        .iter()
        .map(|z| z.confidence)
        .fold(0.0, f64::max);
    let risk = STORM_RISK_WEIGHT * storm_probability.unwrap_or(0.0)
        + VACUUM_RISK_WEIGHT * vacuum_score.unwrap_or(0.0)
        + ZONE_RISK_WEIGHT * top_zone;
    if risk.is_nan() {
        return 0.0;
    }
    risk.clamp(0.0, 1.0)
}

/// Assemble a report from a snapshot and its assessment.
///
/// # Errors
///
/// Returns [`EngineError::UnknownSymbol`] when the snapshot is empty.
pub fn assemble_report(
    snapshot: &WindowSnapshot,
    assessment: Assessment,
    convention: VolatilityConvention,
) -> Result<WeatherReport, EngineError> {
    let latest = snapshot
        .latest()
        .ok_or_else(|| EngineError::UnknownSymbol(snapshot.symbol().to_string()))?;

    let Assessment {
        features,
        regime,
        condition,
        recommendation,
        danger_zones,
        vacuum_score,
    } = assessment;
    let v = features.vector;

    let (regime, condition, recommendation, storm_probability, vacuum_score, final_risk) =
        if features.insufficient_data {
            (
                Regime::Undetermined,
                MarketCondition::Unknown,
                Recommendation::abstain(),
                None,
                None,
                None,
            )
        } else {
            let storm = features.diagnostics.storm_probability;
            (
                regime,
                condition,
                recommendation,
                storm,
                vacuum_score,
                Some(final_risk_score(storm, vacuum_score, &danger_zones)),
            )
        };

    let volatility_score = if features.insufficient_data {
        v.volatility_score
    } else {
        convention.present(v.volatility_score)
    };

    Ok(WeatherReport {
        symbol: snapshot.symbol().to_string(),
        price: latest.price,
        as_of: latest.timestamp,
        observation_count: snapshot.len(),
        analysis: Analysis {
            volatility_score: wire_score(volatility_score),
            momentum_score: wire_score(v.momentum_score),
            liquidity_score: wire_score(v.liquidity_score),
            safety_score: wire_score(v.safety_score),
            market_condition: condition,
            regime,
            insufficient_data: features.insufficient_data,
            storm_probability,
            vacuum_score,
            final_risk_score: final_risk,
        },
        recommendation,
        danger_zones,
    })
}
