//! Liquidity-vacuum detector.
//!
//! Compares the latest interval's volume intensity (shares per second)
//! against the preceding intervals. A sharp drop, optionally combined with a
//! wide quote, flags the current price as a level where little resting
//! liquidity stands behind the market.

use serde::{Deserialize, Serialize};

use super::{DangerZone, DangerZoneType, ZoneDetector};
use crate::domain::features::stats::seconds_between;
use crate::domain::market_data::{Observation, WindowSnapshot};
use crate::error::EngineError;

const VOLUME_WEIGHT: f64 = 0.7;
const SPREAD_WEIGHT: f64 = 0.3;
/// z-score at which the volume factor saturates.
const Z_SATURATION: f64 = 4.0;

/// Liquidity-vacuum detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacuumConfig {
    /// Intervals forming the baseline.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Minimum baseline intervals before the detector runs.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    /// Relative spread at which the spread factor saturates.
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,
    /// Score required to emit a zone.
    #[serde(default = "default_emit_floor")]
    pub emit_floor: f64,
}

impl Default for VacuumConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            min_observations: default_min_observations(),
            max_spread_pct: default_max_spread_pct(),
            emit_floor: default_emit_floor(),
        }
    }
}

impl VacuumConfig {
    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_observations < 2 || self.lookback < self.min_observations {
            return Err(EngineError::configuration(
                "danger.vacuum requires lookback >= min_observations >= 2",
            ));
        }
        if !(self.max_spread_pct.is_finite() && self.max_spread_pct > 0.0) {
            return Err(EngineError::configuration(
                "danger.vacuum.max_spread_pct must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.emit_floor) {
            return Err(EngineError::configuration(
                "danger.vacuum.emit_floor must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

const fn default_lookback() -> usize {
    30
}

const fn default_min_observations() -> usize {
    5
}

const fn default_max_spread_pct() -> f64 {
    0.01
}

const fn default_emit_floor() -> f64 {
    0.5
}

/// Flags the current price when volume intensity collapses.
#[derive(Debug, Clone)]
pub struct LiquidityVacuumDetector {
    config: VacuumConfig,
}

impl LiquidityVacuumDetector {
    /// Create a detector.
    #[must_use]
    pub const fn new(config: VacuumConfig) -> Self {
        Self { config }
    }

    /// Vacuum score in `[0, 1]` for the latest observation, if enough history.
    #[must_use]
    pub fn score(&self, observations: &[Observation]) -> Option<f64> {
        let latest = observations.last()?;
        let skip = observations.len().saturating_sub(self.config.lookback + 2);
        let intensities: Vec<f64> = observations[skip..]
            .windows(2)
            .filter_map(|pair| {
                let elapsed = seconds_between(pair[0].timestamp, pair[1].timestamp);
                (elapsed > 0.0).then(|| pair[1].volume / elapsed)
            })
            .collect();

        let (current, baseline) = intensities.split_last()?;
        if baseline.len() < self.config.min_observations {
            return None;
        }

        let n = baseline.len() as f64;
        let mean = baseline.iter().sum::<f64>() / n;
        let std = (baseline.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

        let volume_factor = if std > f64::EPSILON * mean.max(1.0) {
            ((mean - current) / std / Z_SATURATION).clamp(0.0, 1.0)
        } else if mean > 0.0 {
            ((mean - current) / mean).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let spread_factor = latest
            .relative_spread()
            .map_or(0.0, |s| (s / self.config.max_spread_pct).min(1.0));

        Some((VOLUME_WEIGHT * volume_factor + SPREAD_WEIGHT * spread_factor).min(1.0))
    }
}

impl ZoneDetector for LiquidityVacuumDetector {
    fn zone_type(&self) -> DangerZoneType {
        DangerZoneType::LiquidityVacuum
    }

    fn detect(&self, snapshot: &WindowSnapshot) -> Vec<DangerZone> {
        let (Some(latest), Some(score)) = (snapshot.latest(), self.score(snapshot.observations()))
        else {
            return Vec::new();
        };
        if score >= self.config.emit_floor {
            vec![DangerZone::new(
                latest.price,
                DangerZoneType::LiquidityVacuum,
                score,
            )]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};

    fn series(volumes: &[f64]) -> Vec<Observation> {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(base + TimeDelta::seconds(i as i64 * 60), 100.0, v))
            .collect()
    }

    fn detector() -> LiquidityVacuumDetector {
        LiquidityVacuumDetector::new(VacuumConfig::default())
    }

    #[test]
    fn test_volume_collapse_flags_current_price() {
        let mut volumes = vec![0.0];
        volumes.extend([1_000.0, 1_100.0, 900.0, 1_050.0, 950.0, 1_000.0, 1_020.0, 980.0]);
        volumes.push(0.0);
        let snap = WindowSnapshot::new("AAPL", series(&volumes));

        let zones = detector().detect(&snap);

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].zone_type, DangerZoneType::LiquidityVacuum);
        assert_eq!(zones[0].level, 100.0);
        assert!(zones[0].confidence >= 0.5);
    }

    #[test]
    fn test_steady_volume_is_quiet() {
        let snap = WindowSnapshot::new("AAPL", series(&[1_000.0; 12]));
        assert!(detector().detect(&snap).is_empty());
        assert_eq!(detector().score(snap.observations()), Some(0.0));
    }

    #[test]
    fn test_wide_spread_alone_does_not_emit() {
        let mut obs = series(&[1_000.0; 12]);
        if let Some(last) = obs.last_mut() {
            *last = last.clone().with_quote(99.0, 101.0);
        }
        let score = detector().score(&obs).unwrap();
        assert!((score - 0.3).abs() < 1e-12);
        assert!(detector().detect(&WindowSnapshot::new("AAPL", obs)).is_empty());
    }

    #[test]
    fn test_needs_baseline() {
        let obs = series(&[1_000.0, 1_000.0, 0.0]);
        assert!(detector().score(&obs).is_none());
    }
}
