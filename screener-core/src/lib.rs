//! Screener Core — domain types, indicators, candlestick patterns, and the
//! stock-screening strategies.
//!
//! - Domain types (bars, fundamentals, series, signals)
//! - Indicator library over ascending daily bars
//! - Candlestick pattern classifier
//! - Ten strategy scorers behind one `Strategy` trait
//! - Tagged strategy configs, named presets and the settings resolver

pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod pattern;
pub mod presets;
pub mod strategies;

pub use config::{StrategyConfig, StrategyKind, ValidateConfig};
pub use domain::{Bar, FinancialReport, SecuritySeries, StrategySignal, Valuation};
pub use error::ScreenError;
pub use presets::PresetRegistry;
pub use strategies::{
    build_strategy, rank_results, BatchOutcome, SecurityError, Strategy, StrategyResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed to worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<SecuritySeries>();
        require_sync::<SecuritySeries>();
        require_send::<StrategyConfig>();
        require_sync::<StrategyConfig>();
        require_send::<StrategyResult>();
        require_sync::<StrategyResult>();
        require_send::<BatchOutcome>();
        require_sync::<BatchOutcome>();
        require_send::<PresetRegistry>();
        require_sync::<PresetRegistry>();
        require_send::<ScreenError>();
        require_sync::<ScreenError>();

        require_send::<Box<dyn Strategy>>();
        require_sync::<Box<dyn Strategy>>();
    }

    /// Architecture contract: strategies see one series at a time and
    /// cannot mutate it.
    #[test]
    fn strategy_trait_takes_series_by_shared_reference() {
        fn _check_trait_object_builds(
            strategy: &dyn Strategy,
            series: &SecuritySeries,
        ) -> Result<StrategyResult, ScreenError> {
            strategy.analyze(series)
        }
    }
}
