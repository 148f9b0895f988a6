//! Weather Engine Service
//!
//! Facade over the window registry and the analytics pipeline. Exposes the
//! ingestion operation (`admit`) and the two query operations
//! (`get_weather`, `get_danger_zones`). Queries rebuild everything from a
//! fresh snapshot; nothing derived is cached between calls.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::registry::WindowRegistry;
use super::report::{Assessment, WeatherReport, assemble_report};
use crate::domain::danger::{DangerConfig, DangerZone, DangerZoneDetector};
use crate::domain::features::{FeatureConfig, FeatureExtractor, VolatilityConvention};
use crate::domain::market_data::{
    AdmitOutcome, Lookback, Observation, WindowConfig, WindowSnapshot,
};
use crate::domain::recommendation::{RecommendationAggregator, RecommendationConfig};
use crate::domain::regime::{RegimeClassifier, RegimeConfig};
use crate::error::EngineError;
use crate::observability;

/// Snapshot selection for queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// History each query analyzes.
    #[serde(default)]
    pub lookback: Lookback,
}

/// Complete analytics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Window sizing.
    #[serde(default)]
    pub window: WindowConfig,
    /// Snapshot selection.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Feature extraction.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Regime thresholds.
    #[serde(default)]
    pub regime: RegimeConfig,
    /// Danger zone detection.
    #[serde(default)]
    pub danger: DangerConfig,
    /// Recommendation thresholds.
    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

impl EngineSettings {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.window.validate()?;
        if matches!(self.analysis.lookback, Lookback::Count(0) | Lookback::Seconds(0)) {
            return Err(EngineError::configuration(
                "analysis.lookback must cover at least one observation",
            ));
        }
        self.features.validate()?;
        self.regime.validate()?;
        self.danger.validate()?;
        self.recommendation.validate()
    }
}

/// The weather engine.
#[derive(Debug)]
pub struct WeatherEngine {
    registry: WindowRegistry,
    lookback: Lookback,
    convention: VolatilityConvention,
    extractor: FeatureExtractor,
    classifier: RegimeClassifier,
    detector: DangerZoneDetector,
    aggregator: RecommendationAggregator,
}

impl WeatherEngine {
    /// Build an engine, failing closed on invalid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if any setting is invalid.
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        settings.validate()?;

        Ok(Self {
            registry: WindowRegistry::new(settings.window),
            lookback: settings.analysis.lookback,
            convention: settings.features.volatility_convention,
            detector: DangerZoneDetector::new(&settings.danger),
            extractor: FeatureExtractor::new(settings.features),
            classifier: RegimeClassifier::new(settings.regime),
            aggregator: RecommendationAggregator::new(settings.recommendation),
        })
    }

    /// Admit an observation for `symbol`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::StaleData`] if older than the window's latest entry
    /// - [`EngineError::InvalidObservation`] if values are unusable
    pub fn admit(
        &self,
        symbol: &str,
        observation: Observation,
    ) -> Result<AdmitOutcome, EngineError> {
        let tracked_before = self.registry.len();
        match self.registry.admit(symbol, observation) {
            Ok(outcome) => {
                observability::record_observation_admitted();
                let tracked = self.registry.len();
                if tracked != tracked_before {
                    observability::update_tracked_symbols(tracked);
                }
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!(symbol, error = %e, "observation rejected");
                observability::record_observation_rejected(e.code().reason());
                Err(e)
            }
        }
    }

    /// Assess a snapshot. Pure: depends only on the snapshot and configuration.
    #[must_use]
    pub fn assess(&self, snapshot: &WindowSnapshot) -> Assessment {
        let price = snapshot.latest().map_or(0.0, |o| o.price);
        let danger_zones = self.detector.detect(snapshot);
        let features = self.extractor.extract(snapshot, &danger_zones);
        let (regime, condition) = self
            .classifier
            .classify(&features.vector, features.insufficient_data);
        let recommendation =
            self.aggregator
                .recommend(&features.vector, regime, &danger_zones, price);

        Assessment {
            features,
            regime,
            condition,
            recommendation,
            danger_zones,
            vacuum_score: self.detector.vacuum_score(snapshot),
        }
    }

    /// Current weather report for `symbol`.
    ///
    /// Below the minimum observation count the report succeeds with
    /// `insufficient_data = true` and neutral scores.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSymbol`] if no window exists.
    pub fn get_weather(&self, symbol: &str) -> Result<WeatherReport, EngineError> {
        let started = Instant::now();
        let snapshot = self.registry.snapshot(symbol, self.lookback)?;
        let assessment = self.assess(&snapshot);
        let report = assemble_report(&snapshot, assessment, self.convention)?;

        observability::record_report(
            report.analysis.market_condition.as_str(),
            started.elapsed().as_secs_f64(),
        );
        for zone in &report.danger_zones {
            observability::record_danger_zone(zone.zone_type.as_str());
        }
        tracing::debug!(
            symbol = %report.symbol,
            regime = %report.analysis.regime,
            condition = %report.analysis.market_condition,
            insufficient_data = report.analysis.insufficient_data,
            zones = report.danger_zones.len(),
            "weather report assembled"
        );

        Ok(report)
    }

    /// Ranked danger zones for `symbol`; empty when none are detected.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSymbol`] if no window exists.
    pub fn get_danger_zones(&self, symbol: &str) -> Result<Vec<DangerZone>, EngineError> {
        let snapshot = self.registry.snapshot(symbol, self.lookback)?;
        Ok(self.detector.detect(&snapshot))
    }

    /// Tracked symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.registry.symbols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::Action;
    use crate::domain::regime::{MarketCondition, Regime};
    use chrono::{DateTime, TimeDelta, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn engine() -> WeatherEngine {
        WeatherEngine::new(EngineSettings::default()).unwrap()
    }

    fn seed_trend(engine: &WeatherEngine, symbol: &str, days: i64, daily_return: f64) {
        for i in 0..days {
            let price = 100.0 * (1.0 + daily_return).powi(i as i32);
            engine
                .admit(symbol, Observation::new(base() + TimeDelta::days(i), price, 1_000.0))
                .unwrap();
        }
    }

    #[test]
    fn invalid_settings_fail_closed() {
        let mut settings = EngineSettings::default();
        settings.features.safety.weights.volatility = 0.9;
        let err = WeatherEngine::new(settings).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn zero_count_lookback_rejected() {
        let settings = EngineSettings {
            analysis: AnalysisConfig {
                lookback: Lookback::Count(0),
            },
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn unknown_symbol_on_both_queries() {
        let engine = engine();
        assert!(matches!(
            engine.get_weather("NOPE"),
            Err(EngineError::UnknownSymbol(_))
        ));
        assert!(matches!(
            engine.get_danger_zones("NOPE"),
            Err(EngineError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn steady_uptrend_report() {
        let engine = engine();
        seed_trend(&engine, "AAPL", 60, 0.003);

        let report = engine.get_weather("AAPL").unwrap();

        assert!(!report.analysis.insufficient_data);
        assert_eq!(report.observation_count, 60);
        assert!(report.analysis.momentum_score >= 60);
        assert_eq!(report.analysis.regime, Regime::TrendingBull);
        assert_ne!(report.analysis.market_condition, MarketCondition::Unknown);
        assert!(report.analysis.storm_probability.is_some());
        assert_eq!(report.analysis.vacuum_score, Some(0.0));
        let risk = report.analysis.final_risk_score.unwrap();
        assert!((0.0..=1.0).contains(&risk));
    }

    #[test]
    fn steady_downtrend_is_bearish() {
        let engine = engine();
        seed_trend(&engine, "XYZ", 60, -0.004);

        let report = engine.get_weather("XYZ").unwrap();

        assert_eq!(report.analysis.regime, Regime::TrendingBear);
        assert_ne!(report.recommendation.action, Action::Buy);
    }

    #[test]
    fn no_zones_is_empty_not_error() {
        let engine = engine();
        seed_trend(&engine, "AAPL", 30, 0.0);
        assert!(engine.get_danger_zones("AAPL").unwrap().is_empty());
    }

    #[test]
    fn assess_is_pure() {
        let engine = engine();
        seed_trend(&engine, "AAPL", 30, 0.002);
        let snapshot = engine.registry.snapshot("AAPL", Lookback::All).unwrap();
        assert_eq!(engine.assess(&snapshot), engine.assess(&snapshot));
    }
}
