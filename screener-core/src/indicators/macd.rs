//! Moving Average Convergence Divergence (MACD).
//!
//! MACD = EMA(fast) - EMA(slow); Signal = EMA(signal) of MACD;
//! Histogram = MACD - Signal. MACD is defined from index slow-1, the
//! signal line from slow+signal-2.

use serde::{Deserialize, Serialize};

use super::check_period;
use super::ema::ema_of_series;
use crate::domain::Bar;
use crate::error::ScreenError;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// The three aligned MACD series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> Result<Macd, ScreenError> {
    if fast >= slow {
        return Err(ScreenError::InvalidConfig(format!(
            "MACD fast period ({fast}) must be shorter than slow period ({slow})"
        )));
    }
    check_period(fast, slow, bars.len())?;
    check_period(signal, slow, bars.len())?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast_ema = ema_of_series(&closes, fast);
    let slow_ema = ema_of_series(&closes, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_of_series(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    })
}

/// MACD with the conventional 12/26/9 parameters.
pub fn macd_default(bars: &[Bar]) -> Result<Macd, ScreenError> {
    macd(bars, MACD_FAST, MACD_SLOW, MACD_SIGNAL)
}
