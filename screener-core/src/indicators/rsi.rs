//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! First value at index `period`; needs period+1 bars.
//! Edge case: avg_loss == 0 → RSI = 100.

use super::check_period;
use crate::domain::Bar;
use crate::error::ScreenError;

/// Default RSI lookback.
pub const RSI_PERIOD: usize = 14;

pub fn rsi(bars: &[Bar], period: usize) -> Result<Vec<f64>, ScreenError> {
    check_period(period, period + 1, bars.len())?;

    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    let mut changes = vec![f64::NAN; n];
    for i in 1..n {
        changes[i] = bars[i].close - bars[i - 1].close;
    }

    // Seed: simple average over the first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return Ok(result);
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    result[period] = compute_rsi(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        if changes[i].is_nan() {
            return Ok(result);
        }

        let gain = changes[i].max(0.0);
        let loss = (-changes[i]).max(0.0);

        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

        result[i] = compute_rsi(avg_gain, avg_loss);
    }

    Ok(result)
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
