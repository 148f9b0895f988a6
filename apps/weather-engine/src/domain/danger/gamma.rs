//! Gamma-exposure detector.
//!
//! Reads the most recent options open-interest profile in the window and
//! flags strikes holding a large share of total interest. Dealer hedging
//! around such strikes tends to pin or accelerate price.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use super::{DangerZone, DangerZoneType, ZoneDetector};
use crate::domain::market_data::{StrikeInterest, WindowSnapshot};
use crate::error::EngineError;

/// Gamma-exposure detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaConfig {
    /// Minimum share of total open interest for a strike to be flagged.
    #[serde(default = "default_concentration_threshold")]
    pub concentration_threshold: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            concentration_threshold: default_concentration_threshold(),
        }
    }
}

impl GammaConfig {
    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.concentration_threshold > 0.0 && self.concentration_threshold <= 1.0) {
            return Err(EngineError::configuration(
                "danger.gamma.concentration_threshold must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

const fn default_concentration_threshold() -> f64 {
    0.2
}

/// Flags strikes with concentrated open interest.
#[derive(Debug, Clone)]
pub struct GammaExposureDetector {
    config: GammaConfig,
}

impl GammaExposureDetector {
    /// Create a detector.
    #[must_use]
    pub const fn new(config: GammaConfig) -> Self {
        Self { config }
    }

    /// Zones for a single open-interest profile. Duplicate strikes are summed.
    #[must_use]
    pub fn from_profile(&self, strikes: &[StrikeInterest]) -> Vec<DangerZone> {
        let mut by_strike: BTreeMap<Decimal, f64> = BTreeMap::new();
        for s in strikes {
            if let Some(strike) = Decimal::from_f64(s.strike) {
                *by_strike.entry(strike).or_default() += s.open_interest;
            }
        }

        let total: f64 = by_strike.values().sum();
        if total <= 0.0 {
            return Vec::new();
        }

        by_strike
            .into_iter()
            .filter_map(|(strike, interest)| {
                let share = interest / total;
                let level = strike.to_f64()?;
                (share >= self.config.concentration_threshold)
                    .then(|| DangerZone::new(level, DangerZoneType::GammaExposure, share))
            })
            .collect()
    }
}

impl ZoneDetector for GammaExposureDetector {
    fn zone_type(&self) -> DangerZoneType {
        DangerZoneType::GammaExposure
    }

    fn detect(&self, snapshot: &WindowSnapshot) -> Vec<DangerZone> {
        snapshot
            .observations()
            .iter()
            .rev()
            .find_map(|o| o.open_interest_by_strike.as_deref())
            .map(|profile| self.from_profile(profile))
            .unwrap_or_default()
    }
}
