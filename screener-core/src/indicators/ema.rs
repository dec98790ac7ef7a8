//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[period-1] = SMA of first `period` close values.

use super::check_period;
use crate::domain::Bar;
use crate::error::ScreenError;

/// EMA of closes. Fails when `bars.len() < period`.
pub fn ema(bars: &[Bar], period: usize) -> Result<Vec<f64>, ScreenError> {
    check_period(period, period, bars.len())?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    Ok(ema_of_series(&closes, period))
}

/// Compute raw EMA values from a pre-extracted f64 slice.
///
/// Leading NaNs in `values` are skipped: the seed is the mean of the first
/// `period` values after the last leading NaN. This lets MACD feed its own
/// NaN-prefixed line back in for the signal EMA.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let start = values.iter().position(|v| !v.is_nan()).unwrap_or(n);
    if n - start < period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let mut sum = 0.0;
    for &v in &values[start..start + period] {
        if v.is_nan() {
            return result;
        }
        sum += v;
    }
    let seed = sum / period as f64;
    result[start + period - 1] = seed;

    let mut prev = seed;
    for i in (start + period)..n {
        if values[i].is_nan() {
            // once tainted, everything after stays NaN
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
