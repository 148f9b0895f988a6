//! Ladder-attack detector.
//!
//! A ladder is a burst of trades walking the price one way within a few
//! seconds, typically on shrinking size. Runs are found greedily: from each
//! start the run is extended while it stays inside the time budget and keeps
//! enough monotonic steps, and scanning resumes at the run's end.
//!
//! Conformance blends four signals:
//!
//! | Signal | Weight | Meaning |
//! |--------|--------|---------|
//! | monotonic | 0.4 | fraction of steps moving in the run's direction |
//! | speed | 0.2 | `1 - 0.5 * elapsed / max_elapsed` |
//! | shrink | 0.2 | fraction of steps whose volume did not grow |
//! | magnitude | 0.2 | `min(1, move / (2 * min_total_move))` |
//!
//! A zone is emitted at the run's terminal price when conformance reaches
//! the configured floor.

use serde::{Deserialize, Serialize};

use super::{DangerZone, DangerZoneType, ZoneDetector};
use crate::domain::features::stats::seconds_between;
use crate::domain::market_data::{Observation, WindowSnapshot};
use crate::error::EngineError;

const MONOTONIC_WEIGHT: f64 = 0.4;
const SPEED_WEIGHT: f64 = 0.2;
const SHRINK_WEIGHT: f64 = 0.2;
const MAGNITUDE_WEIGHT: f64 = 0.2;

/// Ladder-attack detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Minimum steps (price changes) in a run.
    #[serde(default = "default_min_run_steps")]
    pub min_run_steps: usize,
    /// Maximum seconds from the first to the last trade of a run.
    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: f64,
    /// Minimum fraction of steps moving in the run's direction.
    #[serde(default = "default_min_monotonicity")]
    pub min_monotonicity: f64,
    /// Minimum relative move from first to last price.
    #[serde(default = "default_min_total_move_pct")]
    pub min_total_move_pct: f64,
    /// Conformance required to emit a zone.
    #[serde(default = "default_conformance_floor")]
    pub conformance_floor: f64,
    /// Only the most recent N observations are scanned.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            min_run_steps: default_min_run_steps(),
            max_elapsed_secs: default_max_elapsed_secs(),
            min_monotonicity: default_min_monotonicity(),
            min_total_move_pct: default_min_total_move_pct(),
            conformance_floor: default_conformance_floor(),
            scan_limit: default_scan_limit(),
        }
    }
}

impl LadderConfig {
    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_run_steps == 0 {
            return Err(EngineError::configuration(
                "danger.ladder.min_run_steps must be positive",
            ));
        }
        if !(self.max_elapsed_secs.is_finite() && self.max_elapsed_secs > 0.0) {
            return Err(EngineError::configuration(
                "danger.ladder.max_elapsed_secs must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_monotonicity) {
            return Err(EngineError::configuration(
                "danger.ladder.min_monotonicity must be in [0, 1]",
            ));
        }
        if !(self.min_total_move_pct.is_finite() && self.min_total_move_pct > 0.0) {
            return Err(EngineError::configuration(
                "danger.ladder.min_total_move_pct must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.conformance_floor) {
            return Err(EngineError::configuration(
                "danger.ladder.conformance_floor must be in [0, 1]",
            ));
        }
        if self.scan_limit < 2 {
            return Err(EngineError::configuration(
                "danger.ladder.scan_limit must be at least 2",
            ));
        }
        Ok(())
    }
}

const fn default_min_run_steps() -> usize {
    3
}

const fn default_max_elapsed_secs() -> f64 {
    5.0
}

const fn default_min_monotonicity() -> f64 {
    0.8
}

const fn default_min_total_move_pct() -> f64 {
    0.02
}

const fn default_conformance_floor() -> f64 {
    0.6
}

const fn default_scan_limit() -> usize {
    200
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn of(from: f64, to: f64) -> Option<Self> {
        if to > from {
            Some(Self::Up)
        } else if to < from {
            Some(Self::Down)
        } else {
            None
        }
    }

    fn conforms(self, from: f64, to: f64) -> bool {
        Self::of(from, to) == Some(self)
    }
}

/// A candidate run `trades[start..=end]`.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    end: usize,
    direction: Direction,
    conforming: usize,
}

impl Run {
    const fn steps(&self) -> usize {
        self.end - self.start
    }
}

/// Detects sequential price-walking.
#[derive(Debug, Clone)]
pub struct LadderAttackDetector {
    config: LadderConfig,
}

impl LadderAttackDetector {
    /// Create a detector.
    #[must_use]
    pub const fn new(config: LadderConfig) -> Self {
        Self { config }
    }

    /// Scan observations for ladder runs.
    #[must_use]
    pub fn scan(&self, observations: &[Observation]) -> Vec<DangerZone> {
        let skip = observations.len().saturating_sub(self.config.scan_limit);
        let trades = &observations[skip..];

        let mut zones = Vec::new();
        let mut i = 0;
        while i + 1 < trades.len() {
            match self.longest_run(trades, i) {
                Some(run) => {
                    if let Some(zone) = self.score(trades, &run) {
                        zones.push(zone);
                    }
                    i = run.end;
                }
                None => i += 1,
            }
        }
        zones
    }

    fn longest_run(&self, trades: &[Observation], start: usize) -> Option<Run> {
        let direction = Direction::of(trades[start].price, trades.get(start + 1)?.price)?;
        let origin = trades[start].timestamp;

        let mut best = None;
        let mut conforming = 0usize;
        for end in start + 1..trades.len() {
            if seconds_between(origin, trades[end].timestamp) > self.config.max_elapsed_secs {
                break;
            }
            let step_conforms = direction.conforms(trades[end - 1].price, trades[end].price);
            if step_conforms {
                conforming += 1;
            }
            let steps = end - start;
            if (conforming as f64) / (steps as f64) < self.config.min_monotonicity {
                break;
            }
            if step_conforms && steps >= self.config.min_run_steps {
                best = Some(Run {
                    start,
                    end,
                    direction,
                    conforming,
                });
            }
        }
        best
    }

    fn score(&self, trades: &[Observation], run: &Run) -> Option<DangerZone> {
        let first = &trades[run.start];
        let last = &trades[run.end];

        let signed_move = (last.price - first.price) / first.price;
        let total_move = match run.direction {
            Direction::Up => signed_move,
            Direction::Down => -signed_move,
        };
        if total_move < self.config.min_total_move_pct {
            return None;
        }

        let steps = run.steps() as f64;
        let monotonic = run.conforming as f64 / steps;
        let elapsed = seconds_between(first.timestamp, last.timestamp);
        let speed = 1.0 - 0.5 * (elapsed / self.config.max_elapsed_secs).clamp(0.0, 1.0);
        let shrinking = trades[run.start..=run.end]
            .windows(2)
            .filter(|pair| pair[1].volume <= pair[0].volume)
            .count() as f64;
        let shrink = shrinking / steps;
        let magnitude = (total_move / (2.0 * self.config.min_total_move_pct)).min(1.0);

        let conformance = MONOTONIC_WEIGHT * monotonic
            + SPEED_WEIGHT * speed
            + SHRINK_WEIGHT * shrink
            + MAGNITUDE_WEIGHT * magnitude;

        (conformance >= self.config.conformance_floor)
            .then(|| DangerZone::new(last.price, DangerZoneType::LadderAttack, conformance))
    }
}

impl ZoneDetector for LadderAttackDetector {
    fn zone_type(&self) -> DangerZoneType {
        DangerZoneType::LadderAttack
    }

    fn detect(&self, snapshot: &WindowSnapshot) -> Vec<DangerZone> {
        self.scan(snapshot.observations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn tape(points: &[(i64, f64, f64)]) -> Vec<Observation> {
        points
            .iter()
            .map(|&(ms, price, volume)| {
                Observation::new(base() + TimeDelta::milliseconds(ms), price, volume)
            })
            .collect()
    }

    fn detector() -> LadderAttackDetector {
        LadderAttackDetector::new(LadderConfig::default())
    }

    #[test]
    fn test_descending_ladder_emits_zone_at_terminal_price() {
        let trades = tape(&[
            (1_000, 100.0, 100.0),
            (2_000, 99.0, 100.0),
            (3_000, 97.0, 100.0),
            (4_000, 94.0, 100.0),
        ]);

        let zones = detector().scan(&trades);

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].level, 94.0);
        assert_eq!(zones[0].zone_type, DangerZoneType::LadderAttack);
        // 0.4 + 0.2 * 0.7 + 0.2 + 0.2
        assert!((zones[0].confidence - 0.94).abs() < 1e-9);
    }

    #[test]
    fn test_ascending_ladder_detected() {
        let trades = tape(&[
            (0, 100.0, 500.0),
            (500, 101.0, 400.0),
            (1_000, 102.0, 300.0),
            (1_500, 104.0, 200.0),
        ]);
        let zones = detector().scan(&trades);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].level, 104.0);
    }

    #[test]
    fn test_slow_walk_is_not_a_ladder() {
        let trades = tape(&[
            (0, 100.0, 100.0),
            (60_000, 99.0, 100.0),
            (120_000, 97.0, 100.0),
            (180_000, 94.0, 100.0),
        ]);
        assert!(detector().scan(&trades).is_empty());
    }

    #[test]
    fn test_small_move_is_not_a_ladder() {
        let trades = tape(&[
            (0, 100.0, 100.0),
            (500, 99.99, 100.0),
            (1_000, 99.98, 100.0),
            (1_500, 99.97, 100.0),
        ]);
        assert!(detector().scan(&trades).is_empty());
    }

    #[test]
    fn test_choppy_tape_is_not_a_ladder() {
        let trades = tape(&[
            (0, 100.0, 100.0),
            (500, 97.0, 100.0),
            (1_000, 100.0, 100.0),
            (1_500, 97.0, 100.0),
            (2_000, 100.0, 100.0),
        ]);
        assert!(detector().scan(&trades).is_empty());
    }

    #[test]
    fn test_run_too_short() {
        let trades = tape(&[(0, 100.0, 100.0), (500, 97.0, 100.0), (1_000, 94.0, 100.0)]);
        assert!(detector().scan(&trades).is_empty());
    }

    #[test]
    fn test_growing_volume_lowers_conformance() {
        let shrinking = tape(&[
            (0, 100.0, 400.0),
            (1_000, 99.0, 300.0),
            (2_000, 98.0, 200.0),
            (3_000, 97.0, 100.0),
        ]);
        let growing = tape(&[
            (0, 100.0, 100.0),
            (1_000, 99.0, 200.0),
            (2_000, 98.0, 300.0),
            (3_000, 97.0, 400.0),
        ]);
        let d = detector();
        let a = d.scan(&shrinking);
        let b = d.scan(&growing);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert!(a[0].confidence > b[0].confidence);
    }

    #[test]
    fn test_scan_limit_ignores_old_history() {
        let mut trades = tape(&[
            (0, 100.0, 100.0),
            (1_000, 99.0, 100.0),
            (2_000, 97.0, 100.0),
            (3_000, 94.0, 100.0),
        ]);
        trades.extend((1..=10).map(|i| {
            Observation::new(base() + TimeDelta::minutes(i), 94.0, 100.0)
        }));
        let d = LadderAttackDetector::new(LadderConfig {
            scan_limit: 10,
            ..LadderConfig::default()
        });
        assert!(d.scan(&trades).is_empty());
    }
}
