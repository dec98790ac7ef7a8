//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First valid value at index period-1.

use super::check_period;
use crate::domain::Bar;
use crate::error::ScreenError;

/// SMA of closes. Fails when `bars.len() < period`.
pub fn sma(bars: &[Bar], period: usize) -> Result<Vec<f64>, ScreenError> {
    check_period(period, period, bars.len())?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    Ok(rolling_mean(&closes, period))
}

/// Rolling mean over an arbitrary series. Windows containing NaN yield NaN.
/// Returns all-NaN when the series is shorter than `period`.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_in_window = false;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nan_in_window = true;
        }
        sum += v;
    }

    if !nan_in_window {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        sum = sum - leaving + entering;

        // NaN poisons the running sum, so rescan the window
        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            nan_in_window = false;
            sum = 0.0;
            for &v in &values[(i + 1 - period)..=i] {
                if v.is_nan() {
                    nan_in_window = true;
                }
                sum += v;
            }
            if nan_in_window {
                continue;
            }
        }

        result[i] = sum / period as f64;
    }

    result
}
