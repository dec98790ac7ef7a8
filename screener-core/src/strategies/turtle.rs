//! Turtle breakout — Donchian channel entry/exit with ATR-sized stops.
//!
//! Entry fires when the close clears the highest high of the prior
//! `entry_breakout_period` bars; a close under the lowest low of the prior
//! `exit_breakout_period` bars is an exit and overrides everything else.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, signal_from_score, tail, tier_above, ResultHeader, Strategy, StrategyResult,
    TIERS_80_65_50,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;
use crate::indicators::{atr, highest_high, last_defined, lowest_low};

/// Bars inspected by the trend-strength component.
const TREND_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurtleConfig {
    pub entry_breakout_period: usize,
    pub exit_breakout_period: usize,
    pub atr_period: usize,
    pub stop_loss_atr_multiple: f64,
    pub pyramid_atr_multiple: f64,
    pub max_units: usize,
    pub use_system2: bool,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self::system1()
    }
}

impl TurtleConfig {
    /// Classic system 1: 20-day entry, 10-day exit.
    pub fn system1() -> Self {
        Self {
            entry_breakout_period: 20,
            exit_breakout_period: 10,
            atr_period: 20,
            stop_loss_atr_multiple: 2.0,
            pyramid_atr_multiple: 0.5,
            max_units: 4,
            use_system2: false,
        }
    }

    /// Classic system 2: 55-day entry, 20-day exit.
    pub fn system2() -> Self {
        Self {
            entry_breakout_period: 55,
            exit_breakout_period: 20,
            use_system2: true,
            ..Self::system1()
        }
    }

    pub fn conservative() -> Self {
        Self {
            entry_breakout_period: 30,
            exit_breakout_period: 15,
            atr_period: 20,
            stop_loss_atr_multiple: 3.0,
            pyramid_atr_multiple: 1.0,
            max_units: 3,
            use_system2: false,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            entry_breakout_period: 10,
            exit_breakout_period: 5,
            atr_period: 10,
            stop_loss_atr_multiple: 1.5,
            pyramid_atr_multiple: 0.3,
            max_units: 5,
            use_system2: false,
        }
    }
}

impl ValidateConfig for TurtleConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(
            self.entry_breakout_period > 0 && self.exit_breakout_period > 0 && self.atr_period > 0,
            "turtle periods must be > 0",
        )?;
        ensure(
            self.exit_breakout_period < self.entry_breakout_period,
            format!(
                "exit_breakout_period ({}) must be shorter than entry_breakout_period ({})",
                self.exit_breakout_period, self.entry_breakout_period
            ),
        )?;
        ensure(
            self.stop_loss_atr_multiple > 0.0 && self.pyramid_atr_multiple > 0.0,
            "ATR multiples must be > 0",
        )?;
        ensure(self.max_units >= 1, "max_units must be at least 1")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurtleResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub entry_breakout_price: f64,
    pub exit_breakout_price: f64,
    pub is_entry_breakout: bool,
    pub is_exit_breakout: bool,
    pub atr: f64,
    pub stop_loss_price: f64,
    /// Add-on prices for units 2..=max_units.
    pub pyramid_levels: Vec<f64>,
    /// Position size (percent of capital) that risks 1% at the stop.
    pub unit_size_pct: f64,
    pub distance_to_entry_pct: f64,
    pub distance_to_exit_pct: f64,
    pub trend_strength: f64,
    /// Breakout-magnitude component, out of 30. Zero without a breakout.
    pub breakout_score: f64,
    /// Turtle system, 1 or 2, named by `use_system2`.
    pub system: u8,
}

#[derive(Debug, Clone)]
pub struct TurtleStrategy {
    config: TurtleConfig,
}

impl TurtleStrategy {
    pub fn new(config: TurtleConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TurtleConfig {
        &self.config
    }
}

/// Trend strength 0..=100 over the trailing window: price position (30),
/// breakout magnitude capped at 10% (30) and up-day ratio (40).
fn trend_strength(bars: &[Bar], close: f64, entry_price: f64) -> f64 {
    let window = tail(bars, TREND_WINDOW);
    let position = match (highest_high(window), lowest_low(window)) {
        (Some(hi), Some(lo)) if hi > lo => ((close - lo) / (hi - lo)).clamp(0.0, 1.0) * 30.0,
        _ => 15.0,
    };
    let breakout = if close > entry_price && entry_price > 0.0 {
        let pct = (close - entry_price) / entry_price * 100.0;
        pct.min(10.0) / 10.0 * 30.0
    } else {
        0.0
    };
    let up_days = window.iter().filter(|b| b.is_bullish()).count();
    let up_score = up_days as f64 / window.len().max(1) as f64 * 40.0;
    (position + breakout + up_score).min(100.0)
}

fn pct_from(value: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (value - reference) / reference * 100.0
    } else {
        0.0
    }
}

impl Strategy for TurtleStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Turtle
    }

    fn required_bars(&self) -> usize {
        let c = &self.config;
        c.entry_breakout_period
            .max(c.exit_breakout_period)
            .max(c.atr_period)
            + 1
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let required = self.required_bars();
        let latest = checked_latest(series, required)?;
        let c = &self.config;
        let bars = &series.bars;
        let history = &bars[..bars.len() - 1];
        let short = ScreenError::InsufficientData {
            required,
            actual: bars.len(),
        };

        let entry_price = highest_high(tail(history, c.entry_breakout_period)).ok_or(short.clone())?;
        let exit_price = lowest_low(tail(history, c.exit_breakout_period)).ok_or(short)?;
        let atr_value = last_defined(&atr(bars, c.atr_period)?).unwrap_or(0.0);

        let close = latest.close;
        let is_entry_breakout = close > entry_price;
        let is_exit_breakout = close < exit_price;
        let distance_to_entry_pct = pct_from(close, entry_price);
        let distance_to_exit_pct = pct_from(close, exit_price);
        let atr_pct = if close > 0.0 { atr_value / close * 100.0 } else { 0.0 };

        let stop_loss_price = close - atr_value * c.stop_loss_atr_multiple;
        let pyramid_levels = (1..c.max_units)
            .map(|k| close + k as f64 * atr_value * c.pyramid_atr_multiple)
            .collect();
        let stop_risk_pct = atr_pct * c.stop_loss_atr_multiple;
        let unit_size_pct = if stop_risk_pct > 0.0 {
            (100.0 / stop_risk_pct).min(100.0)
        } else {
            100.0
        };
        let trend = trend_strength(bars, close, entry_price);

        let mut breakout_score = 0.0;
        let (signal, strength, risk, description) = if is_exit_breakout {
            (
                StrategySignal::StrongSell,
                0.0,
                5,
                format!(
                    "closed below the {}-day low; exit signal ({distance_to_exit_pct:.2}% from exit line)",
                    c.exit_breakout_period
                ),
            )
        } else if is_entry_breakout {
            breakout_score = if distance_to_entry_pct >= 5.0 {
                30.0
            } else {
                tier_above(distance_to_entry_pct, &[(3.0, 25.0), (1.0, 20.0)]).max(15.0)
            };
            let trend_score = trend / 100.0 * 40.0;
            let volatility_score = if atr_pct < 2.0 {
                20.0
            } else if atr_pct < 4.0 {
                15.0
            } else if atr_pct < 6.0 {
                10.0
            } else {
                5.0
            };
            let safety_score =
                tier_above(distance_to_exit_pct, &[(20.0, 10.0), (10.0, 7.0), (5.0, 4.0)]);
            let score = breakout_score + trend_score + volatility_score + safety_score;
            let risk = if atr_pct > 5.0 {
                4
            } else if atr_pct > 3.0 {
                3
            } else {
                2
            };
            (
                signal_from_score(score, &TIERS_80_65_50),
                score,
                risk,
                format!(
                    "broke the {}-day high by {distance_to_entry_pct:.2}%, ATR {atr_value:.2} ({atr_pct:.2}%), {distance_to_exit_pct:.2}% above exit line",
                    c.entry_breakout_period
                ),
            )
        } else {
            let score = tier_above(distance_to_entry_pct, &[(-2.0, 40.0), (-5.0, 20.0)]);
            (
                signal_from_score(score, &TIERS_80_65_50),
                score,
                3,
                format!(
                    "no breakout; {:.2}% below the {}-day high",
                    distance_to_entry_pct.abs(),
                    c.entry_breakout_period
                ),
            )
        };

        debug!(
            code = %series.code,
            entry_price,
            exit_price,
            atr = atr_value,
            trend,
            breakout_score,
            strength,
            "turtle evaluated"
        );

        let system = if c.use_system2 { 2 } else { 1 };
        let description = format!("system {system}: {description}");
        Ok(StrategyResult::Turtle(TurtleResult {
            header: ResultHeader::new(series, latest, signal, strength, risk, description),
            entry_breakout_price: entry_price,
            exit_breakout_price: exit_price,
            is_entry_breakout,
            is_exit_breakout,
            atr: atr_value,
            stop_loss_price,
            pyramid_levels,
            unit_size_pct,
            distance_to_entry_pct,
            distance_to_exit_pct,
            trend_strength: trend,
            breakout_score,
            system,
        }))
    }
}
