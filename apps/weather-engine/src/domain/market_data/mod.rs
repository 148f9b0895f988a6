//! Market data window.
//!
//! A bounded, time-ordered buffer of observations for one symbol. The
//! window is the sole owner of raw history; everything the engine reports
//! is recomputed from a snapshot of it.
//!
//! Eviction is FIFO by time and happens synchronously on admit:
//! - entries older than the retention horizon (measured back from the
//!   newest observation, not the wall clock)
//! - entries beyond the hard capacity cap

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ============================================================================
// Constants
// ============================================================================

/// Default hard capacity of a window.
const DEFAULT_CAPACITY: usize = 5_000;

/// Default retention horizon in calendar days.
const DEFAULT_RETENTION_DAYS: u32 = 365;

// ============================================================================
// Types
// ============================================================================

/// Aggregate option open interest at a single strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeInterest {
    /// Strike price.
    pub strike: f64,
    /// Open interest (contracts) across calls and puts.
    pub open_interest: f64,
}

/// A single trade/quote observation. Immutable once admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Trade (or last) price.
    pub price: f64,
    /// Traded volume since the previous observation.
    #[serde(default)]
    pub volume: f64,
    /// Best bid, when quotes are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    /// Best ask, when quotes are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    /// Options open interest by strike, when an options chain is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest_by_strike: Option<Vec<StrikeInterest>>,
}

impl Observation {
    /// Create a trade-only observation.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
            bid: None,
            ask: None,
            open_interest_by_strike: None,
        }
    }

    /// Attach a bid/ask quote.
    #[must_use]
    pub const fn with_quote(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Attach an options open-interest profile.
    #[must_use]
    pub fn with_open_interest(mut self, strikes: Vec<StrikeInterest>) -> Self {
        self.open_interest_by_strike = Some(strikes);
        self
    }

    /// Bid/ask spread relative to the mid price, when both sides are quoted.
    #[must_use]
    pub fn relative_spread(&self) -> Option<f64> {
        let (bid, ask) = (self.bid?, self.ask?);
        let mid = (bid + ask) / 2.0;
        (mid > 0.0).then(|| (ask - bid) / mid)
    }

    /// Check that every value is usable by the statistics downstream.
    pub fn validate(&self, symbol: &str) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidObservation {
            symbol: symbol.to_string(),
            reason,
        };

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(invalid(format!("price must be positive, got {}", self.price)));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(invalid(format!(
                "volume must be non-negative, got {}",
                self.volume
            )));
        }
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => {
                if !bid.is_finite() || !ask.is_finite() || bid <= 0.0 || ask <= 0.0 {
                    return Err(invalid("bid/ask must be positive".to_string()));
                }
                if bid > ask {
                    return Err(invalid(format!("crossed quote: bid {bid} > ask {ask}")));
                }
            }
            (None, None) => {}
            _ => return Err(invalid("bid and ask must be quoted together".to_string())),
        }
        if let Some(strikes) = &self.open_interest_by_strike
            && strikes.iter().any(|s| {
                !s.strike.is_finite()
                    || s.strike <= 0.0
                    || !s.open_interest.is_finite()
                    || s.open_interest < 0.0
            })
        {
            return Err(invalid(
                "open interest strikes must be positive with non-negative interest".to_string(),
            ));
        }
        Ok(())
    }
}

/// Window sizing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Hard cap on retained observations.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Retention horizon in calendar days.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            retention_days: default_retention_days(),
        }
    }
}

impl WindowConfig {
    /// Validate sizing.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.capacity == 0 {
            return Err(EngineError::configuration("window.capacity must be positive"));
        }
        if self.retention_days == 0 {
            return Err(EngineError::configuration(
                "window.retention_days must be positive",
            ));
        }
        Ok(())
    }

    /// Retention horizon as a duration.
    #[must_use]
    pub fn retention(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.retention_days))
    }
}

const fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

/// How much history a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookback {
    /// Every retained observation.
    #[default]
    All,
    /// The most recent N observations.
    Count(usize),
    /// Observations within N seconds of the newest one.
    Seconds(u64),
}

/// Result of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Observation appended; `evicted` older entries were dropped.
    Appended {
        /// Number of entries evicted by retention or capacity.
        evicted: usize,
    },
    /// Observation shared the latest timestamp and replaced it (last write wins).
    Replaced,
}

/// A read-only, owned copy of a window's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    symbol: String,
    observations: Vec<Observation>,
}

impl WindowSnapshot {
    /// Build a snapshot directly (used by tests and replay tooling).
    #[must_use]
    pub fn new(symbol: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            symbol: symbol.into(),
            observations,
        }
    }

    /// Symbol the snapshot belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Observations in timestamp order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Newest observation.
    #[must_use]
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }
}

// ============================================================================
// Market Data Window
// ============================================================================

/// Bounded, strictly time-ordered observation buffer for one symbol.
#[derive(Debug)]
pub struct MarketDataWindow {
    symbol: String,
    observations: VecDeque<Observation>,
    capacity: usize,
    retention: TimeDelta,
}

impl MarketDataWindow {
    /// Create an empty window.
    #[must_use]
    pub fn new(symbol: &str, config: &WindowConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            observations: VecDeque::with_capacity(config.capacity.min(DEFAULT_CAPACITY)),
            capacity: config.capacity.max(1),
            retention: config.retention(),
        }
    }

    /// Admit an observation.
    ///
    /// Appends when newer than the latest entry, replaces the latest entry on
    /// an equal timestamp, and rejects older observations with
    /// [`EngineError::StaleData`] leaving the window untouched.
    pub fn admit(&mut self, observation: Observation) -> Result<AdmitOutcome, EngineError> {
        observation.validate(&self.symbol)?;

        if let Some(latest) = self.observations.back_mut() {
            if observation.timestamp < latest.timestamp {
                return Err(EngineError::StaleData {
                    symbol: self.symbol.clone(),
                    timestamp: observation.timestamp,
                    latest: latest.timestamp,
                });
            }
            if observation.timestamp == latest.timestamp {
                *latest = observation;
                return Ok(AdmitOutcome::Replaced);
            }
        }

        let newest = observation.timestamp;
        self.observations.push_back(observation);
        Ok(AdmitOutcome::Appended {
            evicted: self.evict(newest),
        })
    }

    fn evict(&mut self, newest: DateTime<Utc>) -> usize {
        let cutoff = newest.checked_sub_signed(self.retention);
        let mut evicted = 0;

        while let Some(cutoff) = cutoff
            && self
                .observations
                .front()
                .is_some_and(|front| front.timestamp < cutoff)
        {
            self.observations.pop_front();
            evicted += 1;
        }

        while self.observations.len() > self.capacity {
            self.observations.pop_front();
            evicted += 1;
        }

        evicted
    }

    /// Copy out the observations covered by `lookback`.
    #[must_use]
    pub fn snapshot(&self, lookback: Lookback) -> WindowSnapshot {
        let observations: Vec<Observation> = match lookback {
            Lookback::All => self.observations.iter().cloned().collect(),
            Lookback::Count(n) => {
                let skip = self.observations.len().saturating_sub(n);
                self.observations.iter().skip(skip).cloned().collect()
            }
            Lookback::Seconds(secs) => match self.observations.back() {
                Some(latest) => {
                    let cutoff = i64::try_from(secs)
                        .ok()
                        .and_then(TimeDelta::try_seconds)
                        .and_then(|span| latest.timestamp.checked_sub_signed(span));
                    self.observations
                        .iter()
                        .filter(|o| cutoff.is_none_or(|c| o.timestamp >= c))
                        .cloned()
                        .collect()
                }
                None => Vec::new(),
            },
        };

        WindowSnapshot {
            symbol: self.symbol.clone(),
            observations,
        }
    }

    /// Symbol this window tracks.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Newest observation.
    #[must_use]
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.back()
    }

    /// Number of retained observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether nothing has been admitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Hard capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================
