//! Consecutive strong — a trailing run of up days closing off their lows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, signal_from_score, tier_above, ResultHeader, Strategy, StrategyResult,
    TIERS_80_65_50,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{pct_change_at, Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsecutiveStrongConfig {
    pub analysis_period: usize,
    pub min_consecutive_days: usize,
}

impl Default for ConsecutiveStrongConfig {
    fn default() -> Self {
        Self::five_days()
    }
}

impl ConsecutiveStrongConfig {
    pub fn three_days() -> Self {
        Self {
            analysis_period: 3,
            min_consecutive_days: 3,
        }
    }

    pub fn five_days() -> Self {
        Self {
            analysis_period: 5,
            min_consecutive_days: 5,
        }
    }

    pub fn ten_days() -> Self {
        Self {
            analysis_period: 10,
            min_consecutive_days: 10,
        }
    }

    /// Eight strong days at the end of a ten-day window.
    pub fn relaxed() -> Self {
        Self {
            analysis_period: 10,
            min_consecutive_days: 8,
        }
    }
}

impl ValidateConfig for ConsecutiveStrongConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(
            self.analysis_period > 0 && self.min_consecutive_days > 0,
            "analysis_period and min_consecutive_days must be > 0",
        )?;
        ensure(
            self.min_consecutive_days <= self.analysis_period,
            "min_consecutive_days must not exceed analysis_period",
        )
    }
}

pub fn is_strong_day(bar: &Bar) -> bool {
    bar.close > bar.low && bar.close > bar.open
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsecutiveStrongResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub consecutive_strong_days: usize,
    pub strong_days_ratio: f64,
    pub daily_strong_flags: Vec<bool>,
    pub daily_changes: Vec<f64>,
    /// Sum of the window's daily percent changes.
    pub total_gain_pct: f64,
    pub avg_daily_gain: f64,
    pub meets_criteria: bool,
}

#[derive(Debug, Clone)]
pub struct ConsecutiveStrongStrategy {
    config: ConsecutiveStrongConfig,
}

impl ConsecutiveStrongStrategy {
    pub fn new(config: ConsecutiveStrongConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConsecutiveStrongConfig {
        &self.config
    }

    fn score(&self, run: usize, ratio: f64, total_gain: f64, avg_gain: f64) -> (f64, i32) {
        let score = run as f64 / self.config.analysis_period as f64 * 40.0
            + ratio * 30.0
            + tier_above(total_gain, &[(20.0, 20.0), (10.0, 15.0), (5.0, 10.0), (0.0, 5.0)])
            + tier_above(avg_gain, &[(3.0, 10.0), (2.0, 8.0), (1.0, 5.0), (0.0, 3.0)]);

        let mut risk = if total_gain > 15.0 {
            2
        } else if total_gain > 8.0 {
            3
        } else {
            4
        };
        if run >= self.config.analysis_period {
            risk -= 1;
        }
        (score, risk)
    }
}

impl Strategy for ConsecutiveStrongStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ConsecutiveStrong
    }

    fn required_bars(&self) -> usize {
        self.config.analysis_period
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let bars = &series.bars;
        let start = bars.len() - c.analysis_period;

        let daily_strong_flags: Vec<bool> = bars[start..].iter().map(is_strong_day).collect();
        let daily_changes: Vec<f64> = (start..bars.len())
            .map(|i| pct_change_at(bars, i))
            .collect();

        let run = daily_strong_flags.iter().rev().take_while(|&&s| s).count();
        let strong = daily_strong_flags.iter().filter(|&&s| s).count();
        let strong_days_ratio = strong as f64 / c.analysis_period as f64;
        let total_gain_pct: f64 = daily_changes.iter().sum();
        let avg_daily_gain = total_gain_pct / c.analysis_period as f64;
        let meets_criteria = run >= c.min_consecutive_days;

        let (signal, strength, risk) = if meets_criteria {
            let (score, risk) = self.score(run, strong_days_ratio, total_gain_pct, avg_daily_gain);
            (signal_from_score(score, &TIERS_80_65_50), score, risk)
        } else {
            (StrategySignal::Hold, 0.0, 3)
        };

        debug!(
            code = %series.code,
            run,
            strong,
            total_gain_pct,
            meets_criteria,
            "consecutive strong evaluated"
        );

        let description = format!(
            "{run} strong days in a row ({strong}/{} in window), total gain {total_gain_pct:.2}%",
            c.analysis_period
        );
        Ok(StrategyResult::ConsecutiveStrong(ConsecutiveStrongResult {
            header: ResultHeader::new(series, latest, signal, strength, risk, description),
            consecutive_strong_days: run,
            strong_days_ratio,
            daily_strong_flags,
            daily_changes,
            total_gain_pct,
            avg_daily_gain,
            meets_criteria,
        }))
    }
}
