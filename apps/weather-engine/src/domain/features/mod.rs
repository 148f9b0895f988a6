//! Feature extraction.
//!
//! Turns a window snapshot into the four bounded sub-scores. Every score
//! stays in `f64` here; rounding happens only at the wire boundary.
//!
//! | Score | Derivation |
//! |-------|------------|
//! | volatility | annualized realized vol × 100, clipped to `[0, 100]` |
//! | momentum | logistic of the short vs long TWAP spread, 50 = neutral |
//! | liquidity | recent vs baseline volume intensity, blended with spread |
//! | safety | weighted composite minus a danger-zone proximity penalty |

pub mod stats;
pub mod storm;

use serde::{Deserialize, Serialize};

use crate::domain::danger::DangerZone;
use crate::domain::market_data::WindowSnapshot;
use crate::error::EngineError;
use stats::{
    annualized_realized_volatility, average_relative_spread, time_weighted_price, timed_returns,
    volume_intensity,
};
use storm::{StormConfig, storm_probability};

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;
const WEIGHT_TOLERANCE: f64 = 1e-6;
const DAY_SECS: u64 = 86_400;

// ============================================================================
// Configuration
// ============================================================================

/// How `volatility_score` is presented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityConvention {
    /// Higher score means more volatile (annualized vol %).
    #[default]
    RawMagnitude,
    /// Higher score means calmer (`100 - raw`).
    Calmness,
}

impl VolatilityConvention {
    /// Convert an internal raw-magnitude score to this convention.
    #[must_use]
    pub fn present(self, raw: f64) -> f64 {
        match self {
            Self::RawMagnitude => raw,
            Self::Calmness => SCORE_MAX - raw,
        }
    }
}

/// Momentum settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// Short TWAP horizon in seconds.
    #[serde(default = "default_short_horizon_secs")]
    pub short_horizon_secs: u64,
    /// Long TWAP horizon in seconds.
    #[serde(default = "default_long_horizon_secs")]
    pub long_horizon_secs: u64,
    /// Logistic steepness applied to the relative TWAP spread.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            short_horizon_secs: default_short_horizon_secs(),
            long_horizon_secs: default_long_horizon_secs(),
            sensitivity: default_sensitivity(),
        }
    }
}

/// Liquidity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Horizon of "recent" volume, compared against the whole snapshot.
    #[serde(default = "default_recent_horizon_secs")]
    pub recent_horizon_secs: u64,
    /// Weight of the spread component when quotes exist.
    #[serde(default = "default_spread_weight")]
    pub spread_weight: f64,
    /// Relative spread at which the spread component reaches zero.
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            recent_horizon_secs: default_recent_horizon_secs(),
            spread_weight: default_spread_weight(),
            max_spread_pct: default_max_spread_pct(),
        }
    }
}

/// Composite weights for the safety score. Must sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyWeights {
    /// Weight on calmness (`100 - volatility`).
    #[serde(default = "default_volatility_weight")]
    pub volatility: f64,
    /// Weight on momentum.
    #[serde(default = "default_momentum_weight")]
    pub momentum: f64,
    /// Weight on liquidity.
    #[serde(default = "default_liquidity_weight")]
    pub liquidity: f64,
}

impl Default for SafetyWeights {
    fn default() -> Self {
        Self {
            volatility: default_volatility_weight(),
            momentum: default_momentum_weight(),
            liquidity: default_liquidity_weight(),
        }
    }
}

impl SafetyWeights {
    fn sum(&self) -> f64 {
        self.volatility + self.momentum + self.liquidity
    }
}

/// Safety score settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Composite weights.
    #[serde(default)]
    pub weights: SafetyWeights,
    /// Points subtracted per unit of proximity-weighted zone confidence.
    #[serde(default = "default_danger_penalty")]
    pub danger_penalty: f64,
    /// Distance (relative to price) over which a zone's weight decays by `1/e`.
    #[serde(default = "default_proximity_band_pct")]
    pub proximity_band_pct: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            weights: SafetyWeights::default(),
            danger_penalty: default_danger_penalty(),
            proximity_band_pct: default_proximity_band_pct(),
        }
    }
}

/// Feature extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Minimum observations (`L_min`) before scores are computed.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    /// Score reported for every feature below `L_min`.
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,
    /// Days per year used to annualize volatility.
    #[serde(default = "default_annualization_days")]
    pub annualization_days: f64,
    /// Wire presentation of `volatility_score`.
    #[serde(default)]
    pub volatility_convention: VolatilityConvention,
    /// Momentum settings.
    #[serde(default)]
    pub momentum: MomentumConfig,
    /// Liquidity settings.
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    /// Safety settings.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Storm probability settings.
    #[serde(default)]
    pub storm: StormConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_observations: default_min_observations(),
            neutral_score: default_neutral_score(),
            annualization_days: default_annualization_days(),
            volatility_convention: VolatilityConvention::default(),
            momentum: MomentumConfig::default(),
            liquidity: LiquidityConfig::default(),
            safety: SafetyConfig::default(),
            storm: StormConfig::default(),
        }
    }
}

impl FeatureConfig {
    /// Validate weights, horizons and thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_observations < 2 {
            return Err(EngineError::configuration(
                "features.min_observations must be at least 2",
            ));
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&self.neutral_score) {
            return Err(EngineError::configuration(
                "features.neutral_score must be in [0, 100]",
            ));
        }
        if !(self.annualization_days.is_finite() && self.annualization_days > 0.0) {
            return Err(EngineError::configuration(
                "features.annualization_days must be positive",
            ));
        }

        let m = &self.momentum;
        if m.short_horizon_secs == 0 || m.short_horizon_secs >= m.long_horizon_secs {
            return Err(EngineError::configuration(
                "features.momentum requires 0 < short_horizon_secs < long_horizon_secs",
            ));
        }
        if !(m.sensitivity.is_finite() && m.sensitivity > 0.0) {
            return Err(EngineError::configuration(
                "features.momentum.sensitivity must be positive",
            ));
        }

        let l = &self.liquidity;
        if l.recent_horizon_secs == 0 {
            return Err(EngineError::configuration(
                "features.liquidity.recent_horizon_secs must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&l.spread_weight) {
            return Err(EngineError::configuration(
                "features.liquidity.spread_weight must be in [0, 1]",
            ));
        }
        if !(l.max_spread_pct.is_finite() && l.max_spread_pct > 0.0) {
            return Err(EngineError::configuration(
                "features.liquidity.max_spread_pct must be positive",
            ));
        }

        let s = &self.safety;
        let w = &s.weights;
        if [w.volatility, w.momentum, w.liquidity]
            .iter()
            .any(|x| !x.is_finite() || *x < 0.0)
        {
            return Err(EngineError::configuration(
                "features.safety.weights must be non-negative",
            ));
        }
        if (w.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::configuration(format!(
                "features.safety.weights must sum to 1, got {}",
                w.sum()
            )));
        }
        if !(s.danger_penalty.is_finite() && s.danger_penalty >= 0.0) {
            return Err(EngineError::configuration(
                "features.safety.danger_penalty must be non-negative",
            ));
        }
        if !(s.proximity_band_pct.is_finite() && s.proximity_band_pct > 0.0) {
            return Err(EngineError::configuration(
                "features.safety.proximity_band_pct must be positive",
            ));
        }

        self.storm.validate()
    }
}

const fn default_min_observations() -> usize {
    20
}

const fn default_neutral_score() -> f64 {
    50.0
}

const fn default_annualization_days() -> f64 {
    365.0
}

const fn default_short_horizon_secs() -> u64 {
    7 * DAY_SECS
}

const fn default_long_horizon_secs() -> u64 {
    30 * DAY_SECS
}

const fn default_sensitivity() -> f64 {
    25.0
}

const fn default_recent_horizon_secs() -> u64 {
    5 * DAY_SECS
}

const fn default_spread_weight() -> f64 {
    0.3
}

const fn default_max_spread_pct() -> f64 {
    0.01
}

const fn default_volatility_weight() -> f64 {
    0.4
}

const fn default_momentum_weight() -> f64 {
    0.2
}

const fn default_liquidity_weight() -> f64 {
    0.4
}

const fn default_danger_penalty() -> f64 {
    40.0
}

const fn default_proximity_band_pct() -> f64 {
    0.05
}

// ============================================================================
// Outputs
// ============================================================================

/// The four normalized sub-scores, each in `[0, 100]`.
///
/// `volatility_score` is always raw magnitude here; the wire convention is
/// applied by the report assembler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Annualized realized volatility percentage.
    pub volatility_score: f64,
    /// Momentum, 50 = neutral.
    pub momentum_score: f64,
    /// Liquidity, higher = deeper.
    pub liquidity_score: f64,
    /// Composite safety.
    pub safety_score: f64,
}

impl FeatureVector {
    /// Every score set to `value`.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            volatility_score: value,
            momentum_score: value,
            liquidity_score: value,
            safety_score: value,
        }
    }
}

/// Intermediate measurements behind the scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDiagnostics {
    /// Annualized realized volatility (fraction).
    pub realized_volatility: Option<f64>,
    /// `(TWAP_short - TWAP_long) / TWAP_long`.
    pub momentum_spread: Option<f64>,
    /// Recent / baseline volume intensity.
    pub volume_ratio: Option<f64>,
    /// Time-weighted relative bid/ask spread.
    pub relative_spread: Option<f64>,
    /// Probability of a storm-sized loss over the storm horizon.
    pub storm_probability: Option<f64>,
    /// Points subtracted from safety by danger zones.
    pub danger_penalty: f64,
}

/// Extraction result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureReport {
    /// Scores (neutral when `insufficient_data`).
    pub vector: FeatureVector,
    /// Fewer than `L_min` observations were available.
    pub insufficient_data: bool,
    /// Underlying measurements.
    pub diagnostics: FeatureDiagnostics,
}

// ============================================================================
// Extractor
// ============================================================================

/// Computes [`FeatureVector`]s from window snapshots.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Create an extractor. The configuration is assumed validated.
    #[must_use]
    pub const fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract features from a snapshot given the zones active on it.
    #[must_use]
    pub fn extract(&self, snapshot: &WindowSnapshot, zones: &[DangerZone]) -> FeatureReport {
        if snapshot.len() < self.config.min_observations {
            return FeatureReport {
                vector: FeatureVector::uniform(self.config.neutral_score),
                insufficient_data: true,
                diagnostics: FeatureDiagnostics::default(),
            };
        }

        let observations = snapshot.observations();
        let returns = timed_returns(observations);
        let price = snapshot.latest().map_or(0.0, |o| o.price);

        let realized_volatility =
            annualized_realized_volatility(&returns, self.config.annualization_days);
        let volatility_score = realized_volatility.map_or(self.config.neutral_score, |v| {
            clamp_score(v * 100.0)
        });

        let m = &self.config.momentum;
        let momentum_spread = match (
            time_weighted_price(observations, m.short_horizon_secs as f64),
            time_weighted_price(observations, m.long_horizon_secs as f64),
        ) {
            (Some(short), Some(long)) if long > 0.0 => Some((short - long) / long),
            _ => None,
        };
        let momentum_score = momentum_spread.map_or(self.config.neutral_score, |spread| {
            clamp_score(SCORE_MAX / (1.0 + (-m.sensitivity * spread).exp()))
        });

        let l = &self.config.liquidity;
        let volume_ratio = match (
            volume_intensity(observations, Some(l.recent_horizon_secs as f64)),
            volume_intensity(observations, None),
        ) {
            (Some(recent), Some(baseline)) if baseline > 0.0 => Some(recent / baseline),
            _ => None,
        };
        let relative_spread = average_relative_spread(observations, l.recent_horizon_secs as f64);
        let volume_component = volume_ratio.map_or(self.config.neutral_score, |ratio| {
            SCORE_MAX * (1.0 - (-ratio).exp())
        });
        let liquidity_score = clamp_score(match relative_spread {
            Some(spread) => {
                let spread_component =
                    SCORE_MAX * (1.0 - (spread / l.max_spread_pct).min(1.0));
                (1.0 - l.spread_weight) * volume_component + l.spread_weight * spread_component
            }
            None => volume_component,
        });

        let danger_penalty = self.danger_penalty(zones, price);
        let safety_score = self.safety_score(
            volatility_score,
            momentum_score,
            liquidity_score,
            zones,
            price,
        );

        FeatureReport {
            vector: FeatureVector {
                volatility_score,
                momentum_score,
                liquidity_score,
                safety_score,
            },
            insufficient_data: false,
            diagnostics: FeatureDiagnostics {
                realized_volatility,
                momentum_spread,
                volume_ratio,
                relative_spread,
                storm_probability: storm_probability(&returns, &self.config.storm),
                danger_penalty,
            },
        }
    }

    /// Points subtracted from safety: `penalty · Σ conf · e^(-distance / band)`.
    #[must_use]
    pub fn danger_penalty(&self, zones: &[DangerZone], price: f64) -> f64 {
        let s = &self.config.safety;
        s.danger_penalty
            * zones
                .iter()
                .map(|z| {
                    let distance = z.distance_pct(price);
                    z.confidence * (-distance / s.proximity_band_pct).exp()
                })
                .sum::<f64>()
    }

    /// Weighted composite of calmness, momentum and liquidity, minus the
    /// danger-zone penalty, floor-clamped at 0.
    #[must_use]
    pub fn safety_score(
        &self,
        volatility_score: f64,
        momentum_score: f64,
        liquidity_score: f64,
        zones: &[DangerZone],
        price: f64,
    ) -> f64 {
        let w = &self.config.safety.weights;
        let composite = w.volatility * (SCORE_MAX - volatility_score)
            + w.momentum * momentum_score
            + w.liquidity * liquidity_score;
        clamp_score(composite - self.danger_penalty(zones, price))
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return SCORE_MIN;
    }
    value.clamp(SCORE_MIN, SCORE_MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::danger::DangerZoneType;
    use crate::domain::market_data::Observation;
    use chrono::{DateTime, TimeDelta};
    use proptest::prelude::*;

    fn daily(prices: &[f64], volumes: &[f64]) -> WindowSnapshot {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let observations = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let v = volumes.get(i).copied().unwrap_or(1_000.0);
                Observation::new(base + TimeDelta::days(i as i64), p, v)
            })
            .collect();
        WindowSnapshot::new("AAPL", observations)
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureConfig::default())
    }

    #[test]
    fn test_insufficient_data_is_neutral_and_flagged() {
        let snap = daily(&[100.0; 19], &[]);
        let report = extractor().extract(&snap, &[]);

        assert!(report.insufficient_data);
        assert_eq!(report.vector, FeatureVector::uniform(50.0));
        assert!(report.diagnostics.storm_probability.is_none());
    }

    #[test]
    fn test_flat_series_scores() {
        let snap = daily(&[100.0; 40], &[]);
        let report = extractor().extract(&snap, &[]);

        assert!(!report.insufficient_data);
        assert_eq!(report.vector.volatility_score, 0.0);
        assert!((report.vector.momentum_score - 50.0).abs() < 1e-9);
        // ratio 1 -> 100 * (1 - 1/e)
        assert!((report.vector.liquidity_score - 63.212_055_882_855_77).abs() < 1e-6);
    }

    #[test]
    fn test_uptrend_raises_momentum() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let report = extractor().extract(&daily(&prices, &[]), &[]);
        assert!(report.vector.momentum_score > 60.0);
    }

    #[test]
    fn test_downtrend_lowers_momentum() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 * 0.99f64.powi(i)).collect();
        let report = extractor().extract(&daily(&prices, &[]), &[]);
        assert!(report.vector.momentum_score < 40.0);
    }

    #[test]
    fn test_turbulence_raises_volatility() {
        let prices: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 106.0 })
            .collect();
        let report = extractor().extract(&daily(&prices, &[]), &[]);
        assert!(report.vector.volatility_score > 60.0);
    }

    #[test]
    fn test_thinning_volume_lowers_liquidity() {
        let steady = daily(&[100.0; 40], &[1_000.0; 40]);
        let mut thinning = vec![1_000.0; 35];
        thinning.extend([50.0; 5]);
        let thin = daily(&[100.0; 40], &thinning);

        let a = extractor().extract(&steady, &[]).vector.liquidity_score;
        let b = extractor().extract(&thin, &[]).vector.liquidity_score;
        assert!(b < a);
    }

    #[test]
    fn test_wide_spread_lowers_liquidity() {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let quoted = |spread: f64| {
            let observations = (0..40)
                .map(|i| {
                    Observation::new(base + TimeDelta::days(i), 100.0, 1_000.0)
                        .with_quote(100.0 - spread / 2.0, 100.0 + spread / 2.0)
                })
                .collect();
            WindowSnapshot::new("AAPL", observations)
        };
        let tight = extractor().extract(&quoted(0.01), &[]).vector.liquidity_score;
        let wide = extractor().extract(&quoted(2.0), &[]).vector.liquidity_score;
        assert!(wide < tight);
    }

    #[test]
    fn test_nearby_zone_depresses_safety() {
        let snap = daily(&[100.0; 40], &[]);
        let calm = extractor().extract(&snap, &[]);
        let zone = DangerZone::new(99.0, DangerZoneType::LadderAttack, 0.9);
        let threatened = extractor().extract(&snap, &[zone]);

        assert!(threatened.vector.safety_score < calm.vector.safety_score);
        assert!(threatened.diagnostics.danger_penalty > 0.0);
    }

    #[test]
    fn test_volatility_convention() {
        assert_eq!(VolatilityConvention::RawMagnitude.present(14.0), 14.0);
        assert_eq!(VolatilityConvention::Calmness.present(14.0), 86.0);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = FeatureConfig::default();
        config.safety.weights.momentum = 0.5;
        assert!(config.validate().is_err());
        assert!(FeatureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_horizons_rejected() {
        let mut config = FeatureConfig::default();
        config.momentum.short_horizon_secs = config.momentum.long_horizon_secs;
        assert!(config.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_scores_are_bounded(
            prices in proptest::collection::vec(1.0f64..1_000.0, 20..60),
            volumes in proptest::collection::vec(0.0f64..1e6, 60),
            zone_conf in 0.0f64..=1.0,
        ) {
            let snap = daily(&prices, &volumes);
            let price = prices[prices.len() - 1];
            let zone = DangerZone::new(price, DangerZoneType::GammaExposure, zone_conf);
            let v = extractor().extract(&snap, &[zone]).vector;
            for score in [v.volatility_score, v.momentum_score, v.liquidity_score, v.safety_score] {
                prop_assert!((0.0..=100.0).contains(&score));
            }
        }

        #[test]
        fn prop_safety_decreases_with_zone_confidence(
            vol in 0.0f64..=100.0,
            mom in 0.0f64..=100.0,
            liq in 0.0f64..=100.0,
            distance in 0.0f64..0.1,
            conf in 0.0f64..0.99,
            bump in 0.01f64..0.5,
        ) {
            let e = extractor();
            let price = 100.0;
            let level = price * (1.0 + distance);
            let low = DangerZone::new(level, DangerZoneType::LadderAttack, conf);
            let high = DangerZone::new(level, DangerZoneType::LadderAttack, (conf + bump).min(1.0));

            let s_low = e.safety_score(vol, mom, liq, &[low], price);
            let s_high = e.safety_score(vol, mom, liq, &[high], price);

            if s_low > 0.0 {
                prop_assert!(s_high < s_low);
            } else {
                prop_assert_eq!(s_high, 0.0);
            }
        }

        #[test]
        fn prop_closer_zone_is_more_dangerous(
            near in 0.0f64..0.05,
            extra in 0.01f64..0.1,
            conf in 0.1f64..=1.0,
        ) {
            let e = extractor();
            let near_zone = DangerZone::new(100.0 * (1.0 - near), DangerZoneType::GammaExposure, conf);
            let far_zone = DangerZone::new(100.0 * (1.0 - near - extra), DangerZoneType::GammaExposure, conf);
            prop_assert!(e.danger_penalty(&[near_zone], 100.0) > e.danger_penalty(&[far_zone], 100.0));
        }
    }
}
