//! Domain layer: pure analytics over market data windows.
//!
//! Nothing here performs I/O or holds shared state; every computation is a
//! function of a [`market_data::WindowSnapshot`] and configuration.

pub mod danger;
pub mod features;
pub mod market_data;
pub mod recommendation;
pub mod regime;
