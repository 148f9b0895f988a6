//! Per-symbol window registry.
//!
//! Each symbol owns one [`MarketDataWindow`] behind its own lock: admission
//! for a symbol is serialized by the write lock, while readers copy a
//! snapshot under the read lock and never observe a half-applied admit.
//! Different symbols never contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::market_data::{
    AdmitOutcome, Lookback, MarketDataWindow, Observation, WindowConfig, WindowSnapshot,
};
use crate::error::EngineError;

type SharedWindow = Arc<RwLock<MarketDataWindow>>;

/// Registry of market data windows keyed by symbol.
#[derive(Debug)]
pub struct WindowRegistry {
    config: WindowConfig,
    windows: RwLock<HashMap<String, SharedWindow>>,
}

impl WindowRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Canonical form of a symbol (trimmed, uppercase).
    #[must_use]
    pub fn normalize_symbol(symbol: &str) -> String {
        symbol.trim().to_ascii_uppercase()
    }

    /// Admit an observation, creating the symbol's window on first use.
    ///
    /// The observation is validated before any window is created, so a
    /// window exists only once it holds at least one observation.
    pub fn admit(
        &self,
        symbol: &str,
        observation: Observation,
    ) -> Result<AdmitOutcome, EngineError> {
        let symbol = Self::normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(EngineError::InvalidObservation {
                symbol,
                reason: "symbol must not be empty".to_string(),
            });
        }
        observation.validate(&symbol)?;

        let window = self.window_or_insert(&symbol);
        let mut guard = window.write();
        guard.admit(observation)
    }

    fn window_or_insert(&self, symbol: &str) -> SharedWindow {
        if let Some(window) = self.windows.read().get(symbol) {
            return Arc::clone(window);
        }
        let mut windows = self.windows.write();
        let window = windows.entry(symbol.to_string()).or_insert_with(|| {
            tracing::info!(symbol, "tracking new symbol");
            Arc::new(RwLock::new(MarketDataWindow::new(symbol, &self.config)))
        });
        Arc::clone(window)
    }

    /// Copy the observations for `symbol` covered by `lookback`.
    pub fn snapshot(&self, symbol: &str, lookback: Lookback) -> Result<WindowSnapshot, EngineError> {
        let symbol = Self::normalize_symbol(symbol);
        let window = self
            .windows
            .read()
            .get(&symbol)
            .map(Arc::clone)
            .ok_or(EngineError::UnknownSymbol(symbol))?;
        let snapshot = window.read().snapshot(lookback);
        Ok(snapshot)
    }

    /// Tracked symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.windows.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.read().len()
    }

    /// Whether no symbol is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.read().is_empty()
    }
}
