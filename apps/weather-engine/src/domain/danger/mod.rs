//! Danger zone detection.
//!
//! Independent detectors scan a window snapshot for hazard signatures and
//! emit price levels. Their union is deduplicated by
//! `(level rounded to tick, type)`, ranked by descending confidence (ties
//! broken by proximity to the current price) and truncated.
//!
//! Detectors:
//! - `ladder`: rapid monotonic price-walking with shrinking size
//! - `gamma`: options open interest concentrated at a strike
//! - `vacuum`: volume intensity collapsing against its recent norm

mod gamma;
mod ladder;
mod vacuum;

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::domain::market_data::WindowSnapshot;
use crate::error::EngineError;

pub use gamma::{GammaConfig, GammaExposureDetector};
pub use ladder::{LadderAttackDetector, LadderConfig};
pub use vacuum::{LiquidityVacuumDetector, VacuumConfig};

// ============================================================================
// Types
// ============================================================================

/// Kind of hazard a zone represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerZoneType {
    /// Sequential price-walking consistent with manipulation.
    LadderAttack,
    /// Options open interest clustered at a strike.
    GammaExposure,
    /// Liquidity withdrawn around the current price.
    LiquidityVacuum,
}

impl DangerZoneType {
    /// Wire / metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LadderAttack => "ladder_attack",
            Self::GammaExposure => "gamma_exposure",
            Self::LiquidityVacuum => "liquidity_vacuum",
        }
    }
}

/// A price level flagged as elevated risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    /// Price level.
    pub level: f64,
    /// Hazard type.
    #[serde(rename = "type")]
    pub zone_type: DangerZoneType,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl DangerZone {
    /// Create a zone, clamping confidence into `[0, 1]`.
    #[must_use]
    pub fn new(level: f64, zone_type: DangerZoneType, confidence: f64) -> Self {
        Self {
            level,
            zone_type,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Relative distance from `price` (0.01 = 1%).
    #[must_use]
    pub fn distance_pct(&self, price: f64) -> f64 {
        if price > 0.0 {
            (self.level - price).abs() / price
        } else {
            f64::INFINITY
        }
    }
}

/// A single hazard detector.
pub trait ZoneDetector {
    /// Zone type this detector emits.
    fn zone_type(&self) -> DangerZoneType;

    /// Scan a snapshot. Must be deterministic.
    fn detect(&self, snapshot: &WindowSnapshot) -> Vec<DangerZone>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Danger zone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerConfig {
    /// Price tick used to deduplicate levels.
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    /// Maximum zones in a report.
    #[serde(default = "default_max_zones")]
    pub max_zones: usize,
    /// Ladder-attack detector settings.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Gamma-exposure detector settings.
    #[serde(default)]
    pub gamma: GammaConfig,
    /// Liquidity-vacuum detector settings.
    #[serde(default)]
    pub vacuum: VacuumConfig,
}

impl Default for DangerConfig {
    fn default() -> Self {
        Self {
            tick_size: default_tick_size(),
            max_zones: default_max_zones(),
            ladder: LadderConfig::default(),
            gamma: GammaConfig::default(),
            vacuum: VacuumConfig::default(),
        }
    }
}

impl DangerConfig {
    /// Validate every detector's settings.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.tick_size.is_finite() && self.tick_size > 0.0) {
            return Err(EngineError::configuration("danger.tick_size must be positive"));
        }
        if self.max_zones == 0 {
            return Err(EngineError::configuration("danger.max_zones must be positive"));
        }
        self.ladder.validate()?;
        self.gamma.validate()?;
        self.vacuum.validate()
    }
}

const fn default_tick_size() -> f64 {
    0.01
}

const fn default_max_zones() -> usize {
    10
}

// ============================================================================
// Detector
// ============================================================================

/// Runs every detector and merges their output.
#[derive(Debug, Clone)]
pub struct DangerZoneDetector {
    tick_size: f64,
    max_zones: usize,
    ladder: LadderAttackDetector,
    gamma: GammaExposureDetector,
    vacuum: LiquidityVacuumDetector,
}

impl DangerZoneDetector {
    /// Build from configuration.
    #[must_use]
    pub fn new(config: &DangerConfig) -> Self {
        Self {
            tick_size: config.tick_size,
            max_zones: config.max_zones,
            ladder: LadderAttackDetector::new(config.ladder.clone()),
            gamma: GammaExposureDetector::new(config.gamma.clone()),
            vacuum: LiquidityVacuumDetector::new(config.vacuum.clone()),
        }
    }

    fn detectors(&self) -> [&dyn ZoneDetector; 3] {
        [&self.ladder, &self.gamma, &self.vacuum]
    }

    /// Detect, deduplicate, rank and truncate zones for a snapshot.
    #[must_use]
    pub fn detect(&self, snapshot: &WindowSnapshot) -> Vec<DangerZone> {
        let Some(latest) = snapshot.latest() else {
            return Vec::new();
        };

        let zones = self.detectors().into_iter().flat_map(|d| {
            let found = d.detect(snapshot);
            if !found.is_empty() {
                tracing::debug!(
                    symbol = snapshot.symbol(),
                    detector = d.zone_type().as_str(),
                    count = found.len(),
                    "danger zones detected"
                );
            }
            found
        });

        merge_zones(zones, self.tick_size, latest.price, self.max_zones)
    }

    /// Raw liquidity-vacuum score, whether or not it clears the emit floor.
    #[must_use]
    pub fn vacuum_score(&self, snapshot: &WindowSnapshot) -> Option<f64> {
        self.vacuum.score(snapshot.observations())
    }
}

/// Round a price to the nearest tick.
///
/// Returns `None` for values that cannot be represented (NaN, infinite).
/// Levels whose tick count overflows `Decimal` are returned unrounded.
#[must_use]
pub fn round_to_tick(level: f64, tick_size: f64) -> Option<Decimal> {
    let level = Decimal::from_f64(level)?;
    let tick = Decimal::from_f64(tick_size)?;
    if tick.is_zero() {
        return Some(level);
    }
    let rounded = level
        .checked_div(tick)
        .and_then(|ticks| ticks.round().checked_mul(tick));
    Some(rounded.unwrap_or(level))
}

/// Deduplicate by `(tick-rounded level, type)` keeping the highest
/// confidence, then rank and truncate.
#[must_use]
pub fn merge_zones(
    zones: impl IntoIterator<Item = DangerZone>,
    tick_size: f64,
    current_price: f64,
    max_zones: usize,
) -> Vec<DangerZone> {
    let mut best: HashMap<(Decimal, DangerZoneType), DangerZone> = HashMap::new();

    for zone in zones {
        let Some(tick_level) = round_to_tick(zone.level, tick_size) else {
            continue;
        };
        let Some(level) = tick_level.to_f64() else {
            continue;
        };
        let candidate = DangerZone::new(level, zone.zone_type, zone.confidence);
        best.entry((tick_level, zone.zone_type))
            .and_modify(|existing| {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut merged: Vec<DangerZone> = best.into_values().collect();
    merged.sort_by(|a, b| rank(a, b, current_price));
    merged.truncate(max_zones);
    merged
}

fn rank(a: &DangerZone, b: &DangerZone, current_price: f64) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| {
            (a.level - current_price)
                .abs()
                .total_cmp(&(b.level - current_price).abs())
        })
        .then_with(|| a.level.total_cmp(&b.level))
        .then_with(|| a.zone_type.cmp(&b.zone_type))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{Observation, StrikeInterest};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn zone(level: f64, zone_type: DangerZoneType, confidence: f64) -> DangerZone {
        DangerZone::new(level, zone_type, confidence)
    }

    #[test]
    fn test_round_to_tick() {
        assert_eq!(round_to_tick(100.004, 0.01), Some(dec!(100.00)));
        assert_eq!(round_to_tick(100.006, 0.01), Some(dec!(100.01)));
        assert_eq!(round_to_tick(101.3, 0.5), Some(dec!(101.5)));
        assert_eq!(round_to_tick(f64::NAN, 0.01), None);
    }

    #[test]
    fn test_round_to_tick_overflow_keeps_level() {
        let level = round_to_tick(1e27, 0.01).unwrap();
        assert!((level.to_f64().unwrap() - 1e27).abs() / 1e27 < 1e-12);
    }

    #[test]
    fn test_merge_huge_levels_does_not_panic() {
        let merged = merge_zones(
            vec![
                zone(1e27, DangerZoneType::GammaExposure, 0.7),
                zone(1e27, DangerZoneType::GammaExposure, 0.9),
                zone(0.94e27, DangerZoneType::LadderAttack, 0.8),
            ],
            0.01,
            1e27,
            10,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn test_merge_dedups_by_tick_and_type() {
        let merged = merge_zones(
            [
                zone(100.001, DangerZoneType::LadderAttack, 0.7),
                zone(100.004, DangerZoneType::LadderAttack, 0.9),
                zone(100.0, DangerZoneType::GammaExposure, 0.5),
            ],
            0.01,
            100.0,
            10,
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].zone_type, DangerZoneType::LadderAttack);
        assert_eq!(merged[0].confidence, 0.9);
        assert_eq!(merged[0].level, 100.0);
    }

    #[test]
    fn test_merge_orders_by_confidence_then_proximity() {
        let merged = merge_zones(
            [
                zone(90.0, DangerZoneType::GammaExposure, 0.5),
                zone(101.0, DangerZoneType::GammaExposure, 0.5),
                zone(120.0, DangerZoneType::GammaExposure, 0.8),
            ],
            0.01,
            100.0,
            10,
        );

        let levels: Vec<f64> = merged.iter().map(|z| z.level).collect();
        assert_eq!(levels, vec![120.0, 101.0, 90.0]);
    }

    #[test]
    fn test_merge_truncates() {
        let zones = (0..20).map(|i| zone(100.0 + f64::from(i), DangerZoneType::GammaExposure, 0.5));
        assert_eq!(merge_zones(zones, 0.01, 100.0, 5).len(), 5);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let zones = [
            zone(100.004, DangerZoneType::LadderAttack, 0.7),
            zone(99.0, DangerZoneType::GammaExposure, 0.4),
            zone(98.0, DangerZoneType::LiquidityVacuum, 0.6),
        ];
        let once = merge_zones(zones, 0.01, 100.0, 10);
        let twice = merge_zones(once.clone(), 0.01, 100.0, 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_detector_runs_twice_without_doubling() {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let chain = vec![
            StrikeInterest {
                strike: 100.0,
                open_interest: 8_000.0,
            },
            StrikeInterest {
                strike: 110.0,
                open_interest: 2_000.0,
            },
        ];
        let snapshot = WindowSnapshot::new(
            "AAPL",
            vec![
                Observation::new(base, 100.0, 500.0),
                Observation::new(base + chrono::TimeDelta::seconds(1), 99.0, 400.0),
                Observation::new(base + chrono::TimeDelta::seconds(2), 97.0, 300.0),
                Observation::new(base + chrono::TimeDelta::seconds(3), 94.0, 200.0)
                    .with_open_interest(chain),
            ],
        );
        let detector = DangerZoneDetector::new(&DangerConfig::default());

        let first = detector.detect(&snapshot);
        let second = detector.detect(&snapshot);

        assert_eq!(first, second);
        assert!(first.iter().any(|z| z.zone_type == DangerZoneType::LadderAttack));
        assert!(first.iter().any(|z| z.zone_type == DangerZoneType::GammaExposure));
    }

    #[test]
    fn test_empty_snapshot_has_no_zones() {
        let detector = DangerZoneDetector::new(&DangerConfig::default());
        assert!(detector.detect(&WindowSnapshot::new("AAPL", vec![])).is_empty());
    }

    #[test]
    fn test_zone_type_serializes_as_type_field() {
        let json = serde_json::to_value(zone(94.0, DangerZoneType::LadderAttack, 0.8)).unwrap();
        assert_eq!(json["type"], "ladder_attack");
        assert_eq!(json["level"], 94.0);
    }

    #[test]
    fn test_config_validation() {
        let bad = DangerConfig {
            tick_size: 0.0,
            ..DangerConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(DangerConfig::default().validate().is_ok());
    }
}
