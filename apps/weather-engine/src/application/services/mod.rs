//! Application Services
//!
//! - [`WeatherEngine`]: ingestion and query facade
//! - [`WindowRegistry`]: per-symbol market data windows
//! - [`assemble_report`]: wire report assembly
//! - [`ingest_from`]: drain a feed into the engine

mod engine;
mod ingest;
mod registry;
mod report;

pub use engine::{AnalysisConfig, EngineSettings, WeatherEngine};
pub use ingest::{IngestSummary, ingest_from};
pub use registry::WindowRegistry;
pub use report::{Analysis, Assessment, WeatherReport, assemble_report, final_risk_score};
