//! Price strength — per-day candle strength scored 0..=100 and aggregated
//! over a window.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, mean, signal_from_score, tail, ResultHeader, Strategy, StrategyResult,
    TIERS_80_65_50,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;
use crate::pattern::CandleShape;

/// Daily score at or above which a day counts as strong.
pub const STRONG_DAY: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceStrengthConfig {
    pub analysis_period: usize,
    pub min_avg_strength: f64,
    pub min_strong_days_ratio: f64,
    /// Trailing strong days required at the end of the window.
    pub require_recent_strong_days: usize,
}

impl Default for PriceStrengthConfig {
    fn default() -> Self {
        Self {
            analysis_period: 20,
            min_avg_strength: 60.0,
            min_strong_days_ratio: 0.6,
            require_recent_strong_days: 3,
        }
    }
}

impl PriceStrengthConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn conservative() -> Self {
        Self {
            min_avg_strength: 70.0,
            min_strong_days_ratio: 0.7,
            require_recent_strong_days: 5,
            ..Self::default()
        }
    }

    pub fn aggressive() -> Self {
        Self {
            min_avg_strength: 50.0,
            min_strong_days_ratio: 0.5,
            require_recent_strong_days: 2,
            ..Self::default()
        }
    }
}

impl ValidateConfig for PriceStrengthConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(self.analysis_period >= 5, "analysis_period must be at least 5")?;
        ensure(
            (0.0..=100.0).contains(&self.min_avg_strength),
            "min_avg_strength must lie in [0, 100]",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.min_strong_days_ratio),
            "min_strong_days_ratio must lie in [0, 1]",
        )?;
        ensure(
            self.require_recent_strong_days <= self.analysis_period,
            "require_recent_strong_days must not exceed analysis_period",
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTrend {
    Rising,
    Flat,
    Falling,
}

/// Strength of a single candle, 0..=100.
///
/// Body size (30), short upper shadow (20), a moderate lower shadow (20),
/// close position in the range (30), then ±10 for direction. A bar with no
/// range scores 50.
pub fn daily_strength(bar: &Bar) -> f64 {
    let range = bar.range();
    if range <= 0.0 {
        return 50.0;
    }
    let shape = CandleShape::of(bar);
    let lower = shape.lower_ratio;
    let lower_score = if (0.1..=0.3).contains(&lower) {
        20.0
    } else if lower < 0.1 {
        lower * 200.0
    } else {
        20.0 - (lower - 0.3) * 28.57
    };
    let close_position = (bar.close - bar.low) / range;
    let direction = if bar.is_bullish() { 10.0 } else { -10.0 };

    let score = shape.body_ratio * 30.0
        + (1.0 - shape.upper_ratio) * 20.0
        + lower_score.clamp(0.0, 20.0)
        + close_position * 30.0
        + direction;
    score.clamp(0.0, 100.0)
}

fn strength_trend(scores: &[f64]) -> StrengthTrend {
    let mid = scores.len() / 2;
    if mid == 0 {
        return StrengthTrend::Flat;
    }
    let diff = mean(scores[mid..].iter().copied()) - mean(scores[..mid].iter().copied());
    if diff > 5.0 {
        StrengthTrend::Rising
    } else if diff < -5.0 {
        StrengthTrend::Falling
    } else {
        StrengthTrend::Flat
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStrengthResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub avg_strength: f64,
    pub strong_days: usize,
    pub strong_days_ratio: f64,
    pub recent_strong_days: usize,
    pub strength_trend: StrengthTrend,
    pub daily_scores: Vec<f64>,
    pub meets_criteria: bool,
}

#[derive(Debug, Clone)]
pub struct PriceStrengthStrategy {
    config: PriceStrengthConfig,
}

impl PriceStrengthStrategy {
    pub fn new(config: PriceStrengthConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PriceStrengthConfig {
        &self.config
    }
}

impl Strategy for PriceStrengthStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PriceStrength
    }

    fn required_bars(&self) -> usize {
        self.config.analysis_period
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let daily_scores: Vec<f64> = tail(&series.bars, c.analysis_period)
            .iter()
            .map(daily_strength)
            .collect();

        let avg_strength = mean(daily_scores.iter().copied());
        let strong_days = daily_scores.iter().filter(|&&s| s >= STRONG_DAY).count();
        let strong_days_ratio = strong_days as f64 / daily_scores.len() as f64;
        let recent_strong_days = daily_scores
            .iter()
            .rev()
            .take_while(|&&s| s >= STRONG_DAY)
            .count();
        let trend = strength_trend(&daily_scores);

        let meets_criteria = avg_strength >= c.min_avg_strength
            && strong_days_ratio >= c.min_strong_days_ratio
            && recent_strong_days >= c.require_recent_strong_days;

        let (signal, strength, risk) = if meets_criteria {
            let recent_credit = if c.require_recent_strong_days == 0 {
                1.0
            } else {
                (recent_strong_days as f64 / c.require_recent_strong_days as f64).min(1.0)
            };
            let trend_points = match trend {
                StrengthTrend::Rising => 10.0,
                StrengthTrend::Flat => 5.0,
                StrengthTrend::Falling => 0.0,
            };
            let score = avg_strength / 100.0 * 40.0
                + strong_days_ratio * 30.0
                + recent_credit * 20.0
                + trend_points;

            let mut risk = 3;
            match trend {
                StrengthTrend::Rising => risk -= 1,
                StrengthTrend::Falling => risk += 1,
                StrengthTrend::Flat => {}
            }
            if avg_strength >= 80.0 {
                risk -= 1;
            } else if avg_strength < 50.0 {
                risk += 1;
            }
            (signal_from_score(score, &TIERS_80_65_50), score, risk)
        } else {
            (StrategySignal::Sell, 0.0, 3)
        };

        debug!(
            code = %series.code,
            avg_strength,
            strong_days,
            recent_strong_days,
            ?trend,
            meets_criteria,
            "price strength evaluated"
        );

        let description = format!(
            "average strength {avg_strength:.1}, {strong_days}/{} strong days, {recent_strong_days} in a row, trend {trend:?}",
            daily_scores.len()
        );
        Ok(StrategyResult::PriceStrength(PriceStrengthResult {
            header: ResultHeader::new(series, latest, signal, strength, risk, description),
            avg_strength,
            strong_days,
            strong_days_ratio,
            recent_strong_days,
            strength_trend: trend,
            daily_scores,
            meets_criteria,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, make_ohlc_bars};

    #[test]
    fn flat_bar_scores_fifty() {
        let bar = &make_ohlc_bars(&[(10.0, 10.0, 10.0, 10.0)])[0];
        assert_eq!(daily_strength(bar), 50.0);
    }

    #[test]
    fn marubozu_up_day_scores_near_top() {
        // body 100%, no shadows: 30 + 20 + 0 + 30 + 10
        let bar = &make_ohlc_bars(&[(10.0, 11.0, 10.0, 11.0)])[0];
        assert_approx(daily_strength(bar), 90.0, 1e-9);
    }

    #[test]
    fn down_day_scores_low() {
        let bar = &make_ohlc_bars(&[(11.0, 11.0, 10.0, 10.0)])[0];
        // 30 + 20 + 0 + 0 - 10
        assert_approx(daily_strength(bar), 40.0, 1e-9);
    }

    #[test]
    fn steady_climb_meets_criteria() {
        // make_bars gives each rising bar a body of 1 inside a range of 3
        let closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
        let mut bars = make_bars(&closes);
        for b in &mut bars[1..] {
            b.high = b.close;
            b.low = b.open;
        }
        let strategy = PriceStrengthStrategy::new(PriceStrengthConfig::default()).unwrap();
        let r = match strategy.analyze(&SecuritySeries::new("X", bars)).unwrap() {
            StrategyResult::PriceStrength(r) => r,
            other => panic!("unexpected {:?}", other.kind()),
        };
        assert!(r.meets_criteria);
        assert_eq!(r.recent_strong_days, 20);
        assert_eq!(r.strength_trend, StrengthTrend::Flat);
        // 90/100*40 + 30 + 20 + 5 = 91
        assert_eq!(r.header.signal_strength, 91);
        assert_eq!(r.header.risk_level, 2);
    }

    #[test]
    fn failing_criteria_is_sell_at_zero() {
        let closes: Vec<f64> = (0..25).map(|i| 40.0 - i as f64).collect();
        let strategy = PriceStrengthStrategy::new(PriceStrengthConfig::default()).unwrap();
        let result = strategy.analyze(&SecuritySeries::new("X", make_bars(&closes))).unwrap();
        assert_eq!(result.strategy_signal(), StrategySignal::Sell);
        assert_eq!(result.signal_strength(), 0);
        assert_eq!(result.risk_level(), 3);
    }
}
