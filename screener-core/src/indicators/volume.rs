//! Volume moving average.

use super::check_period;
use super::sma::rolling_mean;
use crate::domain::Bar;
use crate::error::ScreenError;

pub fn volume_ma(bars: &[Bar], period: usize) -> Result<Vec<f64>, ScreenError> {
    check_period(period, period, bars.len())?;
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    Ok(rolling_mean(&volumes, period))
}

/// Mean volume of the `period` bars strictly before `index`.
///
/// Strategies compare today's volume against this baseline so the spike
/// itself does not inflate the average.
pub fn prior_volume_mean(bars: &[Bar], index: usize, period: usize) -> Result<f64, ScreenError> {
    check_period(period, period + 1, index + 1)?;
    let window = &bars[index - period..index];
    Ok(window.iter().map(|b| b.volume).sum::<f64>() / period as f64)
}
