//! Regime classification.
//!
//! Maps a [`FeatureVector`] to a regime label and a weather condition with
//! an explicit threshold table. Rules are checked in priority order and the
//! first match wins, so boundary values always land on exactly one label.
//!
//! Regime priority:
//! 1. `high_volatility`: volatility ≥ `high_volatility`
//! 2. `illiquid`: liquidity ≤ `illiquid`
//! 3. `trending_bull`: momentum ≥ `trend_up`
//! 4. `trending_bear`: momentum ≤ `trend_down`
//! 5. `mean_reverting`: everything else
//!
//! Condition priority:
//! 1. `stormy`: safety < `stormy_safety` or volatility ≥ `high_volatility`
//! 2. `windy`: liquidity ≤ `illiquid` or |momentum − 50| ≥ `windy_momentum_deviation`
//! 3. `sunny`: safety ≥ `sunny_safety` and volatility < `sunny_max_volatility`
//! 4. `cloudy`: everything else

use serde::{Deserialize, Serialize};

use crate::domain::features::FeatureVector;
use crate::error::EngineError;

const NEUTRAL_MOMENTUM: f64 = 50.0;

/// Behavioral regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Sustained upward momentum.
    TrendingBull,
    /// Sustained downward momentum.
    TrendingBear,
    /// No dominant direction.
    MeanReverting,
    /// Realized volatility above threshold.
    HighVolatility,
    /// Volume or spread indicates thin liquidity.
    Illiquid,
    /// Not enough data to classify.
    Undetermined,
}

impl Regime {
    /// Wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TrendingBull => "trending_bull",
            Self::TrendingBear => "trending_bear",
            Self::MeanReverting => "mean_reverting",
            Self::HighVolatility => "high_volatility",
            Self::Illiquid => "illiquid",
            Self::Undetermined => "undetermined",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather label summarizing market conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    /// Safe and calm.
    Sunny,
    /// Nothing alarming, nothing reassuring.
    Cloudy,
    /// Unsafe or highly volatile.
    Stormy,
    /// Thin liquidity or strong directional pressure.
    Windy,
    /// Not enough data.
    Unknown,
}

impl MarketCondition {
    /// Wire / metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Stormy => "stormy",
            Self::Windy => "windy",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MarketCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification thresholds (score units, `[0, 100]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Volatility at or above which the regime is `high_volatility`.
    #[serde(default = "default_high_volatility")]
    pub high_volatility: f64,
    /// Liquidity at or below which the regime is `illiquid`.
    #[serde(default = "default_illiquid")]
    pub illiquid: f64,
    /// Momentum at or above which the regime is `trending_bull`.
    #[serde(default = "default_trend_up")]
    pub trend_up: f64,
    /// Momentum at or below which the regime is `trending_bear`.
    #[serde(default = "default_trend_down")]
    pub trend_down: f64,
    /// Safety below which conditions are `stormy`.
    #[serde(default = "default_stormy_safety")]
    pub stormy_safety: f64,
    /// Momentum distance from neutral at which conditions are `windy`.
    #[serde(default = "default_windy_momentum_deviation")]
    pub windy_momentum_deviation: f64,
    /// Safety at or above which conditions may be `sunny`.
    #[serde(default = "default_sunny_safety")]
    pub sunny_safety: f64,
    /// Volatility below which conditions may be `sunny`.
    #[serde(default = "default_sunny_max_volatility")]
    pub sunny_max_volatility: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            high_volatility: default_high_volatility(),
            illiquid: default_illiquid(),
            trend_up: default_trend_up(),
            trend_down: default_trend_down(),
            stormy_safety: default_stormy_safety(),
            windy_momentum_deviation: default_windy_momentum_deviation(),
            sunny_safety: default_sunny_safety(),
            sunny_max_volatility: default_sunny_max_volatility(),
        }
    }
}

impl RegimeConfig {
    /// Validate ranges and ordering.
    pub fn validate(&self) -> Result<(), EngineError> {
        let all = [
            ("high_volatility", self.high_volatility),
            ("illiquid", self.illiquid),
            ("trend_up", self.trend_up),
            ("trend_down", self.trend_down),
            ("stormy_safety", self.stormy_safety),
            ("windy_momentum_deviation", self.windy_momentum_deviation),
            ("sunny_safety", self.sunny_safety),
            ("sunny_max_volatility", self.sunny_max_volatility),
        ];
        if let Some((name, _)) = all.iter().find(|(_, v)| !(0.0..=100.0).contains(v)) {
            return Err(EngineError::configuration(format!(
                "regime.{name} must be in [0, 100]"
            )));
        }
        if self.trend_down >= self.trend_up {
            return Err(EngineError::configuration(
                "regime.trend_down must be below regime.trend_up",
            ));
        }
        if self.stormy_safety > self.sunny_safety {
            return Err(EngineError::configuration(
                "regime.stormy_safety must not exceed regime.sunny_safety",
            ));
        }
        Ok(())
    }
}

const fn default_high_volatility() -> f64 {
    60.0
}

const fn default_illiquid() -> f64 {
    20.0
}

const fn default_trend_up() -> f64 {
    60.0
}

const fn default_trend_down() -> f64 {
    40.0
}

const fn default_stormy_safety() -> f64 {
    30.0
}

const fn default_windy_momentum_deviation() -> f64 {
    20.0
}

const fn default_sunny_safety() -> f64 {
    65.0
}

const fn default_sunny_max_volatility() -> f64 {
    30.0
}

/// Deterministic threshold-table classifier.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    /// Create a classifier.
    #[must_use]
    pub const fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    /// Regime label for a feature vector.
    #[must_use]
    pub fn regime(&self, v: &FeatureVector) -> Regime {
        let c = &self.config;
        if v.volatility_score >= c.high_volatility {
            Regime::HighVolatility
        } else if v.liquidity_score <= c.illiquid {
            Regime::Illiquid
        } else if v.momentum_score >= c.trend_up {
            Regime::TrendingBull
        } else if v.momentum_score <= c.trend_down {
            Regime::TrendingBear
        } else {
            Regime::MeanReverting
        }
    }

    /// Weather condition for a feature vector.
    #[must_use]
    pub fn condition(&self, v: &FeatureVector) -> MarketCondition {
        let c = &self.config;
        if v.safety_score < c.stormy_safety || v.volatility_score >= c.high_volatility {
            MarketCondition::Stormy
        } else if v.liquidity_score <= c.illiquid
            || (v.momentum_score - NEUTRAL_MOMENTUM).abs() >= c.windy_momentum_deviation
        {
            MarketCondition::Windy
        } else if v.safety_score >= c.sunny_safety && v.volatility_score < c.sunny_max_volatility {
            MarketCondition::Sunny
        } else {
            MarketCondition::Cloudy
        }
    }

    /// Both labels. Insufficient data always yields `undetermined` / `unknown`.
    #[must_use]
    pub fn classify(&self, v: &FeatureVector, insufficient_data: bool) -> (Regime, MarketCondition) {
        if insufficient_data {
            return (Regime::Undetermined, MarketCondition::Unknown);
        }
        (self.regime(v), self.condition(v))
    }
}
