//! Error taxonomy for the weather engine.
//!
//! | Code | HTTP | Usage |
//! |------|------|-------|
//! | `STALE_DATA` | 409 Conflict | Observation older than the window's latest |
//! | `INVALID_OBSERVATION` | 400 Bad Request | Malformed observation values |
//! | `UNKNOWN_SYMBOL` | 404 Not Found | No window exists for the symbol |
//! | `CONFIGURATION` | 500 Internal | Invalid weights/thresholds (fatal at startup) |
//!
//! Insufficient data is deliberately absent: it is a flag carried in a
//! successful report, never an error.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Observation timestamp precedes the latest retained observation.
    StaleData,
    /// Observation failed value validation.
    InvalidObservation,
    /// No market data window exists for the symbol.
    UnknownSymbol,
    /// Invalid engine configuration.
    Configuration,
}

impl ErrorCode {
    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::StaleData => StatusCode::CONFLICT,
            Self::InvalidObservation => StatusCode::BAD_REQUEST,
            Self::UnknownSymbol => StatusCode::NOT_FOUND,
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason string (also used as a metrics label).
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::StaleData => "STALE_DATA",
            Self::InvalidObservation => "INVALID_OBSERVATION",
            Self::UnknownSymbol => "UNKNOWN_SYMBOL",
            Self::Configuration => "CONFIGURATION",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors raised by the engine core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Observation is older than the latest retained entry. The window is unchanged.
    #[error("stale observation for {symbol}: {timestamp} is before latest {latest}")]
    StaleData {
        /// Symbol the observation was admitted for.
        symbol: String,
        /// Timestamp of the rejected observation.
        timestamp: DateTime<Utc>,
        /// Timestamp of the latest retained observation.
        latest: DateTime<Utc>,
    },

    /// Observation values are not usable (non-finite, non-positive price, ...).
    #[error("invalid observation for {symbol}: {reason}")]
    InvalidObservation {
        /// Symbol the observation was admitted for.
        symbol: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No window exists for the requested symbol.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Engine configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Wire error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::StaleData { .. } => ErrorCode::StaleData,
            Self::InvalidObservation { .. } => ErrorCode::InvalidObservation,
            Self::UnknownSymbol(_) => ErrorCode::UnknownSymbol,
            Self::Configuration(_) => ErrorCode::Configuration,
        }
    }

    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Error body returned to HTTP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::StaleData.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InvalidObservation.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::UnknownSymbol.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::Configuration.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::UnknownSymbol).unwrap();
        assert_eq!(json, "\"UNKNOWN_SYMBOL\"");
    }

    #[test]
    fn test_error_body_from_engine_error() {
        let err = EngineError::UnknownSymbol("AAPL".to_string());
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, ErrorCode::UnknownSymbol);
        assert_eq!(body.message, "unknown symbol: AAPL");
    }
}
