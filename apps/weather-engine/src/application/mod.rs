//! Application Layer
//!
//! Orchestrates the domain: owns the per-symbol windows, runs the analytics
//! pipeline per query and defines the port feed adapters implement.

pub mod ports;
pub mod services;
