//! Bar — the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for one security.
///
/// `volume` is in shares and `amount` is turnover in currency units. Both are
/// kept as `f64` because exchange feeds report fractional lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub amount: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Percent change of the close against `prev_close`. Zero when the
    /// reference is not a positive price.
    pub fn pct_change_from(&self, prev_close: f64) -> f64 {
        if prev_close > 0.0 {
            (self.close - prev_close) / prev_close * 100.0
        } else {
            0.0
        }
    }
}

/// Percent change of every bar against its predecessor's close.
///
/// The first bar has no predecessor and is measured against its own open.
pub fn pct_changes(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let reference = if i == 0 { bar.open } else { bars[i - 1].close };
            bar.pct_change_from(reference)
        })
        .collect()
}

/// Percent change of the bar at `index`, using the previous close when one
/// exists in `bars`.
pub fn pct_change_at(bars: &[Bar], index: usize) -> f64 {
    let bar = &bars[index];
    let reference = if index == 0 {
        bar.open
    } else {
        bars[index - 1].close
    };
    bar.pct_change_from(reference)
}
