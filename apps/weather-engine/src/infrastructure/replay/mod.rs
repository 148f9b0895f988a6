//! JSON-lines Replay Source (Driven Adapter)
//!
//! Reads recorded observations, one [`FeedRecord`] per line, and feeds them
//! through the [`ObservationSource`] port. Blank lines and `#` comments are
//! skipped.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::application::ports::{FeedRecord, ObservationSource, SourceError};

/// Observation source over a JSON-lines stream.
pub struct JsonLinesSource<R> {
    lines: Lines<BufReader<R>>,
    line_number: u64,
}

impl JsonLinesSource<File> {
    /// Open a JSON-lines file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| SourceError::Io {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(Self::new(file))
    }
}

impl<R: AsyncRead + Unpin> JsonLinesSource<R> {
    /// Wrap any async reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_number: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ObservationSource for JsonLinesSource<R> {
    async fn next_record(&mut self) -> Result<Option<FeedRecord>, SourceError> {
        loop {
            let Some(line) = self.lines.next_line().await.map_err(|e| SourceError::Io {
                message: e.to_string(),
            })?
            else {
                return Ok(None);
            };
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| SourceError::Malformed {
                    position: self.line_number,
                    message: e.to_string(),
                });
        }
    }
}
