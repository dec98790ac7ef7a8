//! Single limit-up — exactly one limit-up day inside a rising window.
//!
//! The limit-up threshold comes from the board the code trades on, never
//! from configuration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, signal_from_score, tier_at_least, ResultHeader, Strategy, StrategyResult,
    TIERS_80_60_40_20,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{pct_change_at, SecuritySeries};
use crate::error::ScreenError;

/// Daily limit (percent) for the board `code` trades on.
///
/// STAR market (`688`) and ChiNext (`300`) move 20%, the Beijing exchange
/// (`920`) 30%, every other board 10%.
pub fn limit_up_threshold(code: &str) -> f64 {
    if code.starts_with("688") || code.starts_with("300") {
        20.0
    } else if code.starts_with("920") {
        30.0
    } else {
        10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SingleLimitUpConfig {
    pub analysis_period: usize,
    /// Percentage points either side of the board limit still counted as
    /// limit-up. Larger moves (resumptions, listing days) are not.
    pub limit_up_tolerance: f64,
    pub min_up_days: usize,
    pub min_total_gain: f64,
}

impl Default for SingleLimitUpConfig {
    fn default() -> Self {
        Self {
            analysis_period: 20,
            limit_up_tolerance: 0.5,
            min_up_days: 5,
            min_total_gain: 20.0,
        }
    }
}

impl ValidateConfig for SingleLimitUpConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(self.analysis_period >= 5, "analysis_period must be at least 5")?;
        ensure(
            (0.0..=5.0).contains(&self.limit_up_tolerance),
            "limit_up_tolerance must lie in [0, 5]",
        )?;
        ensure(
            self.min_up_days <= self.analysis_period,
            "min_up_days must not exceed analysis_period",
        )?;
        ensure(self.min_total_gain >= 0.0, "min_total_gain must be >= 0")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleLimitUpResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub limit_up_threshold: f64,
    pub limit_up_count: usize,
    pub limit_up_date: Option<chrono::NaiveDate>,
    pub up_days: usize,
    pub total_gain_pct: f64,
    pub daily_changes: Vec<f64>,
    pub qualifies: bool,
}

#[derive(Debug, Clone)]
pub struct SingleLimitUpStrategy {
    config: SingleLimitUpConfig,
}

impl SingleLimitUpStrategy {
    pub fn new(config: SingleLimitUpConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SingleLimitUpConfig {
        &self.config
    }

    /// Score components: limit-up count, up days, total gain.
    fn score(&self, limit_up_count: usize, up_days: usize, total_gain: f64) -> f64 {
        let c = &self.config;
        let count_score = match limit_up_count {
            0 => 0.0,
            1 => 40.0,
            _ => 10.0,
        };
        let up_ratio = if c.min_up_days == 0 {
            1.0
        } else {
            up_days as f64 / c.min_up_days as f64
        };
        let up_score = if up_ratio >= 1.0 {
            30.0
        } else if up_ratio >= 0.6 {
            20.0
        } else if up_ratio > 0.0 {
            10.0
        } else {
            0.0
        };
        let min_gain = c.min_total_gain;
        let gain_score = tier_at_least(
            total_gain,
            &[(min_gain * 2.0, 30.0), (min_gain * 1.5, 20.0), (min_gain, 10.0)],
        );
        count_score + up_score + gain_score
    }
}

impl Strategy for SingleLimitUpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SingleLimitUp
    }

    fn required_bars(&self) -> usize {
        self.config.analysis_period
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let bars = &series.bars;
        let start = bars.len() - c.analysis_period;
        let threshold = limit_up_threshold(&series.code);
        let band = (threshold - c.limit_up_tolerance)..=(threshold + c.limit_up_tolerance);

        let daily_changes: Vec<f64> = (start..bars.len()).map(|i| pct_change_at(bars, i)).collect();
        let limit_up_days: Vec<usize> = daily_changes
            .iter()
            .enumerate()
            .filter(|(_, chg)| band.contains(*chg))
            .map(|(i, _)| start + i)
            .collect();
        let limit_up_count = limit_up_days.len();
        let limit_up_date = limit_up_days.last().map(|&i| bars[i].date);
        let up_days = daily_changes.iter().filter(|&&chg| chg > 0.0).count();

        let base = if start == 0 {
            bars[0].open
        } else {
            bars[start - 1].close
        };
        let total_gain_pct = latest.pct_change_from(base);

        let strength = self.score(limit_up_count, up_days, total_gain_pct);
        let mut risk = 3;
        if total_gain_pct > 50.0 {
            risk = 4;
        } else if total_gain_pct < 10.0 {
            risk = 2;
        }
        if limit_up_count > 1 {
            risk = 4;
        }
        let qualifies =
            limit_up_count == 1 && up_days >= c.min_up_days && total_gain_pct >= c.min_total_gain;

        debug!(
            code = %series.code,
            threshold,
            limit_up_count,
            up_days,
            total_gain_pct,
            strength,
            "single limit-up evaluated"
        );

        let description = format!(
            "{limit_up_count} limit-up day(s) at the {threshold}% board limit, {up_days} up days, {total_gain_pct:.2}% over {} days",
            c.analysis_period
        );
        Ok(StrategyResult::SingleLimitUp(SingleLimitUpResult {
            header: ResultHeader::new(
                series,
                latest,
                signal_from_score(strength, &TIERS_80_60_40_20),
                strength,
                risk,
                description,
            ),
            limit_up_threshold: threshold,
            limit_up_count,
            limit_up_date,
            up_days,
            total_gain_pct,
            daily_changes,
            qualifies,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategySignal;
    use crate::strategies::test_support::series;

    fn run(config: SingleLimitUpConfig, code: &str, closes: &[f64]) -> SingleLimitUpResult {
        let strategy = SingleLimitUpStrategy::new(config).unwrap();
        match strategy.analyze(&series(code, closes)).unwrap() {
            StrategyResult::SingleLimitUp(r) => r,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    /// 20 bars rising 1% a day with one jump of `jump` percent on day 10.
    fn with_jump(jump: f64) -> Vec<f64> {
        let mut closes = vec![100.0];
        for i in 1..20 {
            let step = if i == 10 { jump } else { 1.0 };
            let prev = closes[i - 1];
            closes.push(prev * (1.0 + step / 100.0));
        }
        closes
    }

    #[test]
    fn board_thresholds() {
        assert_eq!(limit_up_threshold("300001.SZ"), 20.0);
        assert_eq!(limit_up_threshold("688001.SH"), 20.0);
        assert_eq!(limit_up_threshold("920001.BJ"), 30.0);
        assert_eq!(limit_up_threshold("000001.SZ"), 10.0);
        assert_eq!(limit_up_threshold("600519.SH"), 10.0);
    }

    #[test]
    fn chinext_band_edges() {
        let default = SingleLimitUpConfig::default();
        for (jump, expected) in [(19.4, 0), (19.9, 1), (20.1, 1), (20.6, 0)] {
            let r = run(default.clone(), "300001.SZ", &with_jump(jump));
            assert_eq!(r.limit_up_count, expected, "{jump}");
        }
        let exact = SingleLimitUpConfig {
            limit_up_tolerance: 0.0,
            ..SingleLimitUpConfig::default()
        };
        assert_eq!(run(exact.clone(), "300001.SZ", &with_jump(19.9)).limit_up_count, 0);
        assert_eq!(run(exact, "300001.SZ", &with_jump(20.1)).limit_up_count, 0);
    }

    #[test]
    fn jump_above_the_board_limit_is_not_a_limit_up() {
        // a 25% resumption day on a 10% board
        let r = run(SingleLimitUpConfig::default(), "000001.SZ", &with_jump(25.0));
        assert_eq!(r.limit_up_count, 0);
        assert_eq!(r.limit_up_date, None);
        assert!(!r.qualifies);
    }

    #[test]
    fn main_board_counts_ten_percent_day() {
        let r = run(SingleLimitUpConfig::default(), "000001.SZ", &with_jump(10.0));
        assert_eq!(r.limit_up_count, 1);
        assert_eq!(r.limit_up_threshold, 10.0);
        // 19 up days and ~32% compounded gain
        assert_eq!(r.up_days, 19);
        assert!(r.total_gain_pct > 30.0);
        assert!(r.qualifies);
        assert_eq!(r.header.signal_strength, 90);
        assert_eq!(r.header.strategy_signal, StrategySignal::StrongBuy);
    }

    #[test]
    fn two_limit_ups_score_lower_and_raise_risk() {
        let mut closes = with_jump(10.0);
        closes[15] = closes[14] * 1.10;
        for i in 16..20 {
            closes[i] = closes[i - 1] * 1.01;
        }
        let r = run(SingleLimitUpConfig::default(), "000001.SZ", &closes);
        assert_eq!(r.limit_up_count, 2);
        assert_eq!(r.header.risk_level, 4);
        assert!(!r.qualifies);
    }

    #[test]
    fn strength_is_monotone_in_gain() {
        let strategy = SingleLimitUpStrategy::new(SingleLimitUpConfig::default()).unwrap();
        let mut last = 0.0;
        for gain in [0.0, 15.0, 20.0, 30.0, 40.0, 80.0] {
            let s = strategy.score(1, 5, gain);
            assert!(s >= last);
            last = s;
        }
    }

    #[test]
    fn ten_bars_with_period_twenty_is_insufficient() {
        let strategy = SingleLimitUpStrategy::new(SingleLimitUpConfig::default()).unwrap();
        assert!(matches!(
            strategy.analyze(&series("000001.SZ", &[10.0; 10])),
            Err(ScreenError::InsufficientData { required: 20, actual: 10 })
        ));
    }

    #[test]
    fn validation_rejects_bad_ranges() {
        let short = SingleLimitUpConfig {
            analysis_period: 3,
            ..SingleLimitUpConfig::default()
        };
        assert!(short.validate().is_err());
        let loose = SingleLimitUpConfig {
            limit_up_tolerance: 6.0,
            ..SingleLimitUpConfig::default()
        };
        assert!(loose.validate().is_err());
    }
}
