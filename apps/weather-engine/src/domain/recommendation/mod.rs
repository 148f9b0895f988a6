//! Recommendation aggregation.
//!
//! `HOLD` unless momentum and safety agree:
//! - `BUY` when both clear the buy thresholds
//! - `SELL` when both breach the sell thresholds
//!
//! Confidence is the smaller of the two scores' normalized distance from
//! the neutral midpoint, so one strong factor never carries the call alone.
//! A `BUY` is downgraded to `HOLD` in vetoed regimes or when a
//! high-confidence danger zone sits near the current price.

use serde::{Deserialize, Serialize};

use crate::domain::danger::DangerZone;
use crate::domain::features::FeatureVector;
use crate::domain::regime::Regime;
use crate::error::EngineError;

const MIDPOINT: f64 = 50.0;

/// Recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Enter or add.
    Buy,
    /// Exit or reduce.
    Sell,
    /// Do nothing.
    Hold,
}

/// Action with a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Action.
    pub action: Action,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Recommendation {
    /// `HOLD` with zero confidence, used when data is insufficient.
    #[must_use]
    pub const fn abstain() -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
        }
    }
}

/// Aggregation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Momentum at or above which `BUY` is possible.
    #[serde(default = "default_buy_threshold")]
    pub buy_momentum: f64,
    /// Safety at or above which `BUY` is possible.
    #[serde(default = "default_buy_threshold")]
    pub buy_safety: f64,
    /// Momentum at or below which `SELL` is possible.
    #[serde(default = "default_sell_threshold")]
    pub sell_momentum: f64,
    /// Safety at or below which `SELL` is possible.
    #[serde(default = "default_sell_threshold")]
    pub sell_safety: f64,
    /// Regimes in which `BUY` is downgraded to `HOLD`.
    #[serde(default = "default_veto_regimes")]
    pub veto_regimes: Vec<Regime>,
    /// Zone confidence at or above which a nearby zone vetoes `BUY`.
    #[serde(default = "default_danger_veto_confidence")]
    pub danger_veto_confidence: f64,
    /// Relative distance from price within which a zone counts as nearby.
    #[serde(default = "default_danger_veto_distance_pct")]
    pub danger_veto_distance_pct: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            buy_momentum: default_buy_threshold(),
            buy_safety: default_buy_threshold(),
            sell_momentum: default_sell_threshold(),
            sell_safety: default_sell_threshold(),
            veto_regimes: default_veto_regimes(),
            danger_veto_confidence: default_danger_veto_confidence(),
            danger_veto_distance_pct: default_danger_veto_distance_pct(),
        }
    }
}

impl RecommendationConfig {
    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.buy_momentum < MIDPOINT
            || self.buy_safety < MIDPOINT
            || self.buy_momentum > 100.0
            || self.buy_safety > 100.0
        {
            return Err(EngineError::configuration(
                "recommendation buy thresholds must be in [50, 100]",
            ));
        }
        if self.sell_momentum > MIDPOINT
            || self.sell_safety > MIDPOINT
            || self.sell_momentum < 0.0
            || self.sell_safety < 0.0
        {
            return Err(EngineError::configuration(
                "recommendation sell thresholds must be in [0, 50]",
            ));
        }
        if self.sell_momentum >= self.buy_momentum || self.sell_safety >= self.buy_safety {
            return Err(EngineError::configuration(
                "recommendation sell thresholds must be below buy thresholds",
            ));
        }
        if !(0.0..=1.0).contains(&self.danger_veto_confidence) {
            return Err(EngineError::configuration(
                "recommendation.danger_veto_confidence must be in [0, 1]",
            ));
        }
        if !(self.danger_veto_distance_pct.is_finite() && self.danger_veto_distance_pct >= 0.0) {
            return Err(EngineError::configuration(
                "recommendation.danger_veto_distance_pct must be non-negative",
            ));
        }
        Ok(())
    }
}

const fn default_buy_threshold() -> f64 {
    60.0
}

const fn default_sell_threshold() -> f64 {
    40.0
}

fn default_veto_regimes() -> Vec<Regime> {
    vec![Regime::HighVolatility, Regime::Illiquid]
}

const fn default_danger_veto_confidence() -> f64 {
    0.8
}

const fn default_danger_veto_distance_pct() -> f64 {
    0.05
}

/// Combines features, regime and zones into one [`Recommendation`].
#[derive(Debug, Clone)]
pub struct RecommendationAggregator {
    config: RecommendationConfig,
}

impl RecommendationAggregator {
    /// Create an aggregator.
    #[must_use]
    pub const fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Recommend an action. `price` is the current price zones are measured from.
    #[must_use]
    pub fn recommend(
        &self,
        v: &FeatureVector,
        regime: Regime,
        zones: &[DangerZone],
        price: f64,
    ) -> Recommendation {
        if regime == Regime::Undetermined {
            return Recommendation::abstain();
        }

        let c = &self.config;
        let (mom, safety) = (v.momentum_score, v.safety_score);

        if mom >= c.buy_momentum && safety >= c.buy_safety {
            if self.buy_vetoed(regime, zones, price) {
                tracing::debug!(regime = %regime, "buy vetoed");
                return hold(mom, safety);
            }
            return Recommendation {
                action: Action::Buy,
                confidence: normalized(mom - MIDPOINT).min(normalized(safety - MIDPOINT)),
            };
        }

        if mom <= c.sell_momentum && safety <= c.sell_safety {
            return Recommendation {
                action: Action::Sell,
                confidence: normalized(MIDPOINT - mom).min(normalized(MIDPOINT - safety)),
            };
        }

        hold(mom, safety)
    }

    fn buy_vetoed(&self, regime: Regime, zones: &[DangerZone], price: f64) -> bool {
        let c = &self.config;
        c.veto_regimes.contains(&regime)
            || zones.iter().any(|z| {
                z.confidence >= c.danger_veto_confidence
                    && z.distance_pct(price) <= c.danger_veto_distance_pct
            })
    }
}

fn normalized(distance: f64) -> f64 {
    (distance / MIDPOINT).clamp(0.0, 1.0)
}

/// HOLD confidence falls as either score strays from neutral.
fn hold(mom: f64, safety: f64) -> Recommendation {
    let deviation = (mom - MIDPOINT).abs().max((safety - MIDPOINT).abs());
    Recommendation {
        action: Action::Hold,
        confidence: 1.0 - normalized(deviation),
    }
}
