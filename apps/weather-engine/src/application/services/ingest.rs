//! Feed ingestion.
//!
//! Drains an [`ObservationSource`] into the engine. Per-record rejections
//! (stale or invalid observations) are logged and counted, never fatal; a
//! source failure stops ingestion and is returned to the caller.

use tokio_util::sync::CancellationToken;

use super::engine::WeatherEngine;
use crate::application::ports::{ObservationSource, SourceError};
use crate::domain::market_data::AdmitOutcome;
use crate::error::EngineError;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Observations appended.
    pub admitted: usize,
    /// Observations that replaced an equal-timestamp entry.
    pub replaced: usize,
    /// Observations rejected as stale.
    pub stale: usize,
    /// Observations rejected as invalid.
    pub invalid: usize,
}

impl IngestSummary {
    /// Total records read.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.admitted + self.replaced + self.stale + self.invalid
    }
}

/// Drain `source` into `engine` until it is exhausted or `shutdown` fires.
///
/// # Errors
///
/// Returns the first [`SourceError`] raised by the source.
pub async fn ingest_from<S>(
    engine: &WeatherEngine,
    source: &mut S,
    shutdown: &CancellationToken,
) -> Result<IngestSummary, SourceError>
where
    S: ObservationSource + ?Sized,
{
    let mut summary = IngestSummary::default();

    loop {
        if shutdown.is_cancelled() {
            tracing::info!(records = summary.total(), "ingestion cancelled");
            break;
        }
        let record = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!(records = summary.total(), "ingestion cancelled");
                break;
            }
            record = source.next_record() => record?,
        };
        let Some(record) = record else {
            break;
        };

        match engine.admit(&record.symbol, record.observation) {
            Ok(AdmitOutcome::Appended { .. }) => summary.admitted += 1,
            Ok(AdmitOutcome::Replaced) => summary.replaced += 1,
            Err(e @ EngineError::StaleData { .. }) => {
                tracing::warn!(symbol = %record.symbol, error = %e, "stale observation skipped");
                summary.stale += 1;
            }
            Err(e) => {
                tracing::warn!(symbol = %record.symbol, error = %e, "invalid observation skipped");
                summary.invalid += 1;
            }
        }
    }

    tracing::info!(
        admitted = summary.admitted,
        replaced = summary.replaced,
        stale = summary.stale,
        invalid = summary.invalid,
        "ingestion finished"
    );
    Ok(summary)
}
