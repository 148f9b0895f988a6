//! Observation Source Port (Driven Port)
//!
//! Interface for feed collaborators that push observations into the engine
//! (live feeds, options chain fetchers, historical replays).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::market_data::Observation;

/// One observation tagged with its symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Instrument symbol.
    pub symbol: String,
    /// The observation itself.
    #[serde(flatten)]
    pub observation: Observation,
}

/// Observation source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The underlying transport failed.
    #[error("observation source I/O error: {message}")]
    Io {
        /// Error details.
        message: String,
    },

    /// A record could not be decoded.
    #[error("malformed record at {position}: {message}")]
    Malformed {
        /// Location of the record (line number, offset, ...).
        position: u64,
        /// Error details.
        message: String,
    },
}

/// Port for pulling observations from a feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObservationSource: Send {
    /// Next record, or `None` once the source is exhausted.
    async fn next_record(&mut self) -> Result<Option<FeedRecord>, SourceError>;
}
