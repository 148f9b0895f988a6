//! Storm probability: chance of a large loss over a short horizon.
//!
//! Fits drift and variance per second from the timed returns, scales both
//! to the horizon, and reads the Gaussian tail below `ln(1 - loss)`.

use serde::{Deserialize, Serialize};

use super::stats::{SECONDS_PER_DAY, TimedReturn};
use crate::error::EngineError;

/// Storm probability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StormConfig {
    /// Loss fraction that counts as a storm (0.05 = 5%).
    #[serde(default = "default_loss_threshold")]
    pub loss_threshold_pct: f64,
    /// Forecast horizon in seconds.
    #[serde(default = "default_horizon_secs")]
    pub horizon_secs: u64,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            loss_threshold_pct: default_loss_threshold(),
            horizon_secs: default_horizon_secs(),
        }
    }
}

impl StormConfig {
    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.loss_threshold_pct > 0.0 && self.loss_threshold_pct < 1.0) {
            return Err(EngineError::configuration(
                "features.storm.loss_threshold_pct must be in (0, 1)",
            ));
        }
        if self.horizon_secs == 0 {
            return Err(EngineError::configuration(
                "features.storm.horizon_secs must be positive",
            ));
        }
        Ok(())
    }
}

const fn default_loss_threshold() -> f64 {
    0.05
}

const fn default_horizon_secs() -> u64 {
    5 * 86_400
}

/// Standard normal CDF.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Probability that the horizon log return falls below `ln(1 - loss_threshold)`.
///
/// Returns `None` with fewer than two returns.
#[must_use]
pub fn storm_probability(returns: &[TimedReturn], config: &StormConfig) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let total_secs: f64 = returns.iter().map(|r| r.elapsed_secs).sum();
    if total_secs <= 0.0 {
        return None;
    }

    let drift = returns.iter().map(|r| r.log_return).sum::<f64>() / total_secs;
    let variance = returns
        .iter()
        .map(|r| (r.log_return - drift * r.elapsed_secs).powi(2))
        .sum::<f64>()
        / total_secs;

    let horizon = config.horizon_secs as f64;
    let horizon_mean = drift * horizon;
    let horizon_sigma = (variance * horizon).sqrt();
    let threshold = (1.0 - config.loss_threshold_pct).ln();

    if horizon_sigma <= f64::EPSILON {
        return Some(if horizon_mean <= threshold { 1.0 } else { 0.0 });
    }

    Some(normal_cdf((threshold - horizon_mean) / horizon_sigma).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn returns(values: &[f64], elapsed_secs: f64) -> Vec<TimedReturn> {
        values
            .iter()
            .map(|&log_return| TimedReturn {
                log_return,
                elapsed_secs,
            })
            .collect()
    }

    #[test]
    fn test_normal_cdf_midpoint() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!(normal_cdf(-3.0) < 0.01);
    }

    #[test]
    fn test_flat_series_has_no_storm() {
        let r = returns(&[0.0; 10], SECONDS_PER_DAY);
        assert_eq!(storm_probability(&r, &StormConfig::default()), Some(0.0));
    }

    #[test]
    fn test_turbulent_series_raises_probability() {
        let calm = returns(&[0.001, -0.001, 0.001, -0.001, 0.001, -0.001], SECONDS_PER_DAY);
        let wild = returns(&[0.06, -0.07, 0.05, -0.08, 0.07, -0.06], SECONDS_PER_DAY);
        let config = StormConfig::default();
        let p_calm = storm_probability(&calm, &config).unwrap();
        let p_wild = storm_probability(&wild, &config).unwrap();
        assert!(p_wild > p_calm);
        assert!(p_wild > 0.1);
    }

    #[test]
    fn test_too_few_returns() {
        let r = returns(&[0.01], SECONDS_PER_DAY);
        assert!(storm_probability(&r, &StormConfig::default()).is_none());
    }

    #[test]
    fn test_config_validation() {
        let bad = StormConfig {
            loss_threshold_pct: 1.5,
            ..StormConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(StormConfig::default().validate().is_ok());
    }
}
