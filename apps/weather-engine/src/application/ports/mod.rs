//! Application Ports
//!
//! - **Driver**: [`crate::application::services::WeatherEngine`] is called
//!   directly by the HTTP adapter.
//! - **Driven**: [`ObservationSource`] is implemented by feed adapters.

mod observation_source_port;

#[cfg(test)]
pub use observation_source_port::MockObservationSource;
pub use observation_source_port::{FeedRecord, ObservationSource, SourceError};
