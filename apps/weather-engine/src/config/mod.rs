//! Configuration module for the weather engine.
//!
//! Loads a YAML file, interpolates environment variables and validates
//! every section before the engine is built. Invalid configuration is
//! fatal: the binary exits before serving any request.
//!
//! # Usage
//!
//! ```rust,ignore
//! use weather_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::{AnalysisConfig, EngineSettings};
use crate::domain::danger::DangerConfig;
use crate::domain::features::FeatureConfig;
use crate::domain::market_data::WindowConfig;
use crate::domain::recommendation::RecommendationConfig;
use crate::domain::regime::RegimeConfig;

pub use server::ServerConfig;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Startup replay of recorded observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// JSON-lines file of `{symbol, timestamp, price, ...}` records.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Market data window sizing.
    #[serde(default)]
    pub window: WindowConfig,
    /// Snapshot selection for queries.
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
    /// Startup replay.
    #[serde(default)]
    pub replay: ReplayConfig,
}

impl Config {
    /// Analytics settings for [`crate::application::services::WeatherEngine`].
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            window: self.window.clone(),
            analysis: self.analysis.clone(),
            features: self.features.clone(),
            regime: self.regime.clone(),
            danger: self.danger.clone(),
            recommendation: self.recommendation.clone(),
        }
    }

    /// HTTP listen address.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the bind address is not a valid IP.
    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.bind_address, self.server.http_port)
            .parse()
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "server.bind_address '{}' is invalid: {e}",
                    self.server.bind_address
                ))
            })
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to `config.yaml`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset variables
/// without a default become empty.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.http_port == 0 {
        return Err(ConfigError::ValidationError(
            "server.http_port must be non-zero".to_string(),
        ));
    }
    config.http_addr()?;

    config
        .engine_settings()
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::VolatilityConvention;
    use crate::domain::market_data::Lookback;
    use crate::domain::regime::Regime;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.http_port, 8085);
        assert_eq!(config.window.capacity, 5_000);
        assert_eq!(config.features.min_observations, 20);
        assert_eq!(config.analysis.lookback, Lookback::All);
        assert!(config.replay.path.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = load_config_from_string("").unwrap();
        assert_eq!(config.server.http_port, 8085);
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r"
server:
  http_port: 9000
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.server.http_port, 9000);
        assert!((config.features.safety.weights.volatility - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
server:
  http_port: 8090
  bind_address: "127.0.0.1"

window:
  capacity: 1000
  retention_days: 90

analysis:
  lookback:
    count: 500

features:
  min_observations: 30
  volatility_convention: calmness
  momentum:
    short_horizon_secs: 86400
    long_horizon_secs: 864000
  safety:
    weights:
      volatility: 0.5
      momentum: 0.25
      liquidity: 0.25
    danger_penalty: 30

regime:
  high_volatility: 70

danger:
  max_zones: 5
  ladder:
    min_run_steps: 4
  gamma:
    concentration_threshold: 0.3

recommendation:
  veto_regimes: [high_volatility]

replay:
  path: /var/lib/weather/seed.jsonl
"#;

        let config = load_config_from_string(yaml).unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.window.capacity, 1000);
        assert_eq!(config.analysis.lookback, Lookback::Count(500));
        assert_eq!(
            config.features.volatility_convention,
            VolatilityConvention::Calmness
        );
        assert_eq!(config.danger.ladder.min_run_steps, 4);
        assert_eq!(config.danger.ladder.max_elapsed_secs, 5.0);
        assert_eq!(config.recommendation.veto_regimes, vec![Regime::HighVolatility]);
        assert_eq!(
            config.replay.path,
            Some(PathBuf::from("/var/lib/weather/seed.jsonl"))
        );
        assert_eq!(config.http_addr().unwrap().port(), 8090);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "port: ${WEATHER_ENGINE_TEST_NONEXISTENT_VAR:-8085}";
        assert_eq!(interpolate_env_vars(input), "port: 8085");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "path: ${WEATHER_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "path: ");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax
    fn test_env_var_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_validation_weights_must_sum_to_one() {
        let yaml = r"
features:
  safety:
    weights:
      volatility: 0.6
      momentum: 0.3
      liquidity: 0.3
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for weights");
        };
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn test_validation_inverted_recommendation_thresholds() {
        let yaml = r"
recommendation:
  sell_momentum: 45
  buy_momentum: 45
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_validation_zero_capacity() {
        let yaml = r"
window:
  capacity: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for capacity");
        };
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_validation_bad_bind_address() {
        let yaml = r"
server:
  bind_address: not-an-ip
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  http_port: 9191").unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.http_port, 9191);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = load_config_from_string(include_str!("../../config.example.yaml")).unwrap();
        assert_eq!(config.danger.ladder.min_run_steps, 3);
        assert_eq!(config.recommendation.veto_regimes.len(), 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_config(Some("/nonexistent/weather-engine.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
