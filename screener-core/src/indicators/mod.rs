//! Indicator library.
//!
//! Pure functions over an ascending bar series. Each returns a `Vec<f64>` of
//! the input length whose leading entries are `f64::NAN` until enough history
//! exists. A series shorter than the indicator's period is an
//! `InsufficientData` error, never a truncated or padded result.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume;

pub use atr::{atr, true_range, wilder_smooth};
pub use ema::{ema, ema_of_series};
pub use macd::{macd, macd_default, Macd};
pub use rsi::{rsi, RSI_PERIOD};
pub use sma::{rolling_mean, sma};
pub use volume::{prior_volume_mean, volume_ma};

use crate::domain::Bar;
use crate::error::ScreenError;

/// Reject a zero period, then require `required` bars.
pub(crate) fn check_period(period: usize, required: usize, actual: usize) -> Result<(), ScreenError> {
    if period == 0 {
        return Err(ScreenError::invalid("indicator period must be > 0"));
    }
    ScreenError::require(required, actual)
}

/// Highest high over `bars`; `None` for an empty slice.
pub fn highest_high(bars: &[Bar]) -> Option<f64> {
    bars.iter().map(|b| b.high).reduce(f64::max)
}

/// Lowest low over `bars`; `None` for an empty slice.
pub fn lowest_low(bars: &[Bar]) -> Option<f64> {
    bars.iter().map(|b| b.low).reduce(f64::min)
}

/// Last non-NaN value of a series.
pub fn last_defined(values: &[f64]) -> Option<f64> {
    values.iter().rev().copied().find(|v| !v.is_nan())
}

// ─── Indicator set ───────────────────────────────────────────────────

/// Per-bar aligned bundle of the common indicators.
///
/// Every vector has the input length. A series whose period exceeds the
/// available history is entirely NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub ma5: Vec<f64>,
    pub ma20: Vec<f64>,
    pub ma60: Vec<f64>,
    pub ema12: Vec<f64>,
    pub ema26: Vec<f64>,
    pub rsi14: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_histogram: Vec<f64>,
    pub volume_ma5: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar]) -> Self {
        let n = bars.len();
        let or_nan = |r: Result<Vec<f64>, ScreenError>| r.unwrap_or_else(|_| vec![f64::NAN; n]);
        let m = macd_default(bars).unwrap_or_else(|_| Macd {
            macd: vec![f64::NAN; n],
            signal: vec![f64::NAN; n],
            histogram: vec![f64::NAN; n],
        });

        Self {
            ma5: or_nan(sma(bars, 5)),
            ma20: or_nan(sma(bars, 20)),
            ma60: or_nan(sma(bars, 60)),
            ema12: or_nan(ema(bars, 12)),
            ema26: or_nan(ema(bars, 26)),
            rsi14: or_nan(rsi(bars, RSI_PERIOD)),
            macd: m.macd,
            macd_signal: m.signal,
            macd_histogram: m.histogram,
            volume_ma5: or_nan(volume_ma(bars, 5)),
        }
    }

    pub fn len(&self) -> usize {
        self.ma5.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ma5.is_empty()
    }
}

// ─── Test helpers ────────────────────────────────────────────────────

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                amount: 1000.0 * close,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            amount: 1000.0 * close,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
