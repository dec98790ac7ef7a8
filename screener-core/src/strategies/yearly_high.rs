//! Yearly high — whether the latest bar sets a new calendar-year high.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{checked_latest, tail, ResultHeader, Strategy, StrategyResult};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YearlyHighConfig {
    /// Only the latest bar may set the high. When false, any of the last
    /// `recent_days` bars may.
    pub check_today_only: bool,
    pub recent_days: usize,
}

impl Default for YearlyHighConfig {
    fn default() -> Self {
        Self {
            check_today_only: true,
            recent_days: 1,
        }
    }
}

impl ValidateConfig for YearlyHighConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(self.recent_days > 0, "recent_days must be > 0")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyHighResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub previous_high: f64,
    pub previous_high_date: NaiveDate,
    /// Bars between the previous high and the latest bar.
    pub days_since_previous_high: usize,
    pub is_yearly_high: bool,
    pub year_start_date: NaiveDate,
    pub trading_days_in_year: usize,
}

#[derive(Debug, Clone)]
pub struct YearlyHighStrategy {
    config: YearlyHighConfig,
}

impl YearlyHighStrategy {
    pub fn new(config: YearlyHighConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &YearlyHighConfig {
        &self.config
    }

    fn excluded(&self) -> usize {
        if self.config.check_today_only {
            1
        } else {
            self.config.recent_days
        }
    }
}

impl Strategy for YearlyHighStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::YearlyHigh
    }

    fn required_bars(&self) -> usize {
        1
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let year = latest.date.year();
        let year_start_date = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
            ScreenError::InvalidSeries {
                code: series.code.clone(),
                reason: format!("no January 1st for year {year}"),
            }
        })?;

        let first_in_year = series.bars.partition_point(|b| b.date < year_start_date);
        let year_bars = &series.bars[first_in_year..];
        let trading_days_in_year = year_bars.len();

        // With too few bars to exclude anything, the whole year is the reference.
        let excluded = self.excluded();
        let reference = if trading_days_in_year > excluded {
            &year_bars[..trading_days_in_year - excluded]
        } else {
            year_bars
        };
        let (high_idx, high_bar) = reference
            .iter()
            .enumerate()
            .fold(None::<(usize, &Bar)>, |best, (i, b)| match best {
                Some((_, top)) if top.high >= b.high => best,
                _ => Some((i, b)),
            })
            .ok_or(ScreenError::InsufficientData {
                required: 1,
                actual: 0,
            })?;
        let previous_high = high_bar.high;

        let is_yearly_high = if self.config.check_today_only {
            latest.high >= previous_high
        } else {
            tail(year_bars, self.config.recent_days)
                .iter()
                .any(|b| b.high >= previous_high)
        };
        let days_since_previous_high = trading_days_in_year - high_idx - 1;

        let (signal, strength) = if is_yearly_high {
            (StrategySignal::Buy, 100.0)
        } else {
            (StrategySignal::Sell, 0.0)
        };

        debug!(
            code = %series.code,
            previous_high,
            is_yearly_high,
            trading_days_in_year,
            "yearly high evaluated"
        );

        let description = format!(
            "{} {year}: close {:.2}, previous high {previous_high:.2} on {}",
            if is_yearly_high { "new high for" } else { "no new high for" },
            latest.close,
            high_bar.date
        );
        Ok(StrategyResult::YearlyHigh(YearlyHighResult {
            header: ResultHeader::new(series, latest, signal, strength, 3, description),
            previous_high,
            previous_high_date: high_bar.date,
            days_since_previous_high,
            is_yearly_high,
            year_start_date,
            trading_days_in_year,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn analyze(config: YearlyHighConfig, bars: Vec<Bar>) -> YearlyHighResult {
        match YearlyHighStrategy::new(config)
            .unwrap()
            .analyze(&SecuritySeries::new("600036.SH", bars))
            .unwrap()
        {
            StrategyResult::YearlyHigh(r) => r,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    /// Bars dated from 2023-12-28 so the first four fall in the prior year.
    fn across_new_year(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2023, 12, 28).unwrap();
        let mut bars = make_bars(closes);
        for (i, b) in bars.iter_mut().enumerate() {
            b.date = start + chrono::Duration::days(i as i64);
        }
        bars
    }

    #[test]
    fn breakout_above_the_year_high_is_buy() {
        let mut bars = across_new_year(&[50.0, 50.0, 50.0, 50.0, 10.0, 12.0, 11.0, 13.0]);
        bars[4].open = 10.0;
        bars[4].high = 11.0;
        let r = analyze(YearlyHighConfig::default(), bars);
        // the 2023 bars at 50 do not count
        assert_eq!(r.trading_days_in_year, 4);
        assert_eq!(r.year_start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(r.is_yearly_high);
        assert_eq!(r.header.signal_strength, 100);
        assert_eq!(r.header.strategy_signal, StrategySignal::Buy);
        assert_eq!(r.header.risk_level, 3);
    }

    #[test]
    fn pullback_is_sell() {
        let r = analyze(YearlyHighConfig::default(), make_bars(&[10.0, 14.0, 12.0, 11.0]));
        assert!(!r.is_yearly_high);
        assert_eq!(r.previous_high, 15.0);
        assert_eq!(r.days_since_previous_high, 2);
        assert_eq!(r.header.strategy_signal, StrategySignal::Sell);
        assert_eq!(r.header.signal_strength, 0);
    }

    #[test]
    fn recent_window_catches_an_earlier_breakout() {
        let mut bars = make_bars(&[10.0, 11.0, 10.5, 14.0, 13.0]);
        bars[4].open = 13.2;
        bars[4].high = 13.5;
        let today_only = analyze(YearlyHighConfig::default(), bars.clone());
        assert!(!today_only.is_yearly_high);
        let recent = analyze(
            YearlyHighConfig {
                check_today_only: false,
                recent_days: 2,
            },
            bars,
        );
        assert!(recent.is_yearly_high);
    }

    #[test]
    fn tied_highs_keep_the_earliest() {
        // highs 11, 15, 15, 15 before the latest bar
        let r = analyze(YearlyHighConfig::default(), make_bars(&[10.0, 14.0, 13.0, 14.0, 12.0]));
        assert_eq!(r.previous_high, 15.0);
        assert_eq!(r.previous_high_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(r.days_since_previous_high, 3);
        assert!(r.is_yearly_high);
    }

    #[test]
    fn single_bar_is_its_own_reference() {
        let r = analyze(YearlyHighConfig::default(), make_bars(&[10.0]));
        assert!(r.is_yearly_high);
        assert_eq!(r.days_since_previous_high, 0);
    }

    #[test]
    fn zero_recent_days_is_rejected() {
        let config = YearlyHighConfig {
            check_today_only: false,
            recent_days: 0,
        };
        assert!(YearlyHighStrategy::new(config).is_err());
    }
}
