//! Elapsed-time weighted statistics over irregularly spaced observations.
//!
//! Each observation is taken to describe the interval since its
//! predecessor, `(t[i-1], t[i]]`. Averages weight by how much of that
//! interval overlaps the horizon being measured, so gaps and bursts in the
//! feed do not bias results the way index-position weighting would.

use chrono::{DateTime, Utc};

use crate::domain::market_data::Observation;

/// Seconds in a calendar day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// A log return together with the time it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedReturn {
    /// `ln(p[i] / p[i-1])`.
    pub log_return: f64,
    /// Seconds between the two observations.
    pub elapsed_secs: f64,
}

/// Seconds from `from` to `to`, with millisecond resolution.
#[must_use]
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1_000.0
}

/// Log returns between consecutive observations.
#[must_use]
pub fn timed_returns(observations: &[Observation]) -> Vec<TimedReturn> {
    observations
        .windows(2)
        .filter_map(|pair| {
            let elapsed_secs = seconds_between(pair[0].timestamp, pair[1].timestamp);
            (elapsed_secs > 0.0 && pair[0].price > 0.0 && pair[1].price > 0.0).then(|| {
                TimedReturn {
                    log_return: (pair[1].price / pair[0].price).ln(),
                    elapsed_secs,
                }
            })
        })
        .collect()
}

/// Annualized realized volatility: `sqrt(Σ r² / Σ Δt)` scaled to a year.
#[must_use]
pub fn annualized_realized_volatility(
    returns: &[TimedReturn],
    annualization_days: f64,
) -> Option<f64> {
    let total_secs: f64 = returns.iter().map(|r| r.elapsed_secs).sum();
    if total_secs <= 0.0 {
        return None;
    }
    let variance_per_sec = returns.iter().map(|r| r.log_return.powi(2)).sum::<f64>() / total_secs;
    Some((variance_per_sec * annualization_days * SECONDS_PER_DAY).sqrt())
}

/// One observation's interval clipped to a trailing horizon.
#[derive(Debug, Clone, Copy)]
struct Overlap<'a> {
    observation: &'a Observation,
    /// Seconds of the interval inside the horizon.
    weight: f64,
    /// Full length of the interval in seconds.
    interval: f64,
}

/// Intervals overlapping the trailing `horizon_secs` (the whole span when `None`).
fn overlaps(
    observations: &[Observation],
    horizon_secs: Option<f64>,
) -> impl Iterator<Item = Overlap<'_>> {
    let end = observations.last().map(|o| o.timestamp);
    let horizon_start = horizon_secs.map_or(f64::NEG_INFINITY, |h| -h);
    observations.windows(2).filter_map(move |pair| {
        let end = end?;
        let interval_start = seconds_between(end, pair[0].timestamp);
        let interval_end = seconds_between(end, pair[1].timestamp);
        let weight = interval_end - interval_start.max(horizon_start);
        (weight > 0.0).then_some(Overlap {
            observation: &pair[1],
            weight,
            interval: interval_end - interval_start,
        })
    })
}

/// Time-weighted average price over the trailing horizon.
///
/// Falls back to the latest price when no interval overlaps the horizon.
#[must_use]
pub fn time_weighted_price(observations: &[Observation], horizon_secs: f64) -> Option<f64> {
    let latest = observations.last()?;
    let (weighted, total) = overlaps(observations, Some(horizon_secs))
        .fold((0.0, 0.0), |(sum, total), o| {
            (sum + o.observation.price * o.weight, total + o.weight)
        });
    if total > 0.0 {
        Some(weighted / total)
    } else {
        Some(latest.price)
    }
}

/// Traded volume per second over the trailing horizon (whole span when `None`).
///
/// Each observation's volume is prorated by the share of its interval
/// inside the horizon.
#[must_use]
pub fn volume_intensity(observations: &[Observation], horizon_secs: Option<f64>) -> Option<f64> {
    let (volume, elapsed) = overlaps(observations, horizon_secs)
        .fold((0.0, 0.0), |(volume, elapsed), o| {
            (
                volume + o.observation.volume * (o.weight / o.interval),
                elapsed + o.weight,
            )
        });
    (elapsed > 0.0).then(|| volume / elapsed)
}

/// Time-weighted relative bid/ask spread over the trailing horizon.
///
/// Only quoted observations contribute. Falls back to the latest quote when
/// quoted observations exist but none overlap the horizon.
#[must_use]
pub fn average_relative_spread(observations: &[Observation], horizon_secs: f64) -> Option<f64> {
    let (weighted, total) = overlaps(observations, Some(horizon_secs))
        .filter_map(|o| o.observation.relative_spread().map(|s| (s, o.weight)))
        .fold((0.0, 0.0), |(sum, total), (s, w)| (sum + s * w, total + w));
    if total > 0.0 {
        return Some(weighted / total);
    }
    observations.iter().rev().find_map(Observation::relative_spread)
}
