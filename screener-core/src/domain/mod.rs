//! Domain types for the screener

pub mod bar;
pub mod series;
pub mod signal;

pub use bar::{pct_change_at, pct_changes, Bar};
pub use series::{FinancialReport, SecuritySeries, Valuation};
pub use signal::StrategySignal;
