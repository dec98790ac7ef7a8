//! Distressed reversal — improving financials at a depressed valuation with
//! a stabilizing tape.
//!
//! Three buckets: financial (40), valuation (30), technical (30).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, signal_from_score, ResultHeader, Strategy, StrategyResult, TIERS_80_65_50,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{pct_change_at, FinancialReport, SecuritySeries, Valuation};
use crate::error::ScreenError;
use crate::indicators::prior_volume_mean;

/// Percentile at or above which a valuation counts as expensive for risk.
const HIGH_PERCENTILE: f64 = 70.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistressedReversalConfig {
    pub min_reports: usize,
    /// ROE improvement (percentage points) between the last two reports.
    pub min_roe_improvement: f64,
    pub min_profit_growth: f64,
    /// Operating cash flow / net profit.
    pub min_cashflow_profit_ratio: f64,
    pub max_debt_ratio: f64,
    /// Number of trailing valuation points ranked.
    pub valuation_window: usize,
    pub low_percentile: f64,
    pub stabilization_days: usize,
    pub volume_ma_period: usize,
    pub volume_surge_ratio: f64,
}

impl Default for DistressedReversalConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl DistressedReversalConfig {
    pub fn standard() -> Self {
        Self {
            min_reports: 2,
            min_roe_improvement: 2.0,
            min_profit_growth: 0.0,
            min_cashflow_profit_ratio: 1.0,
            max_debt_ratio: 70.0,
            valuation_window: 250,
            low_percentile: 30.0,
            stabilization_days: 3,
            volume_ma_period: 20,
            volume_surge_ratio: 1.5,
        }
    }

    pub fn aggressive() -> Self {
        Self {
            min_roe_improvement: 1.0,
            min_cashflow_profit_ratio: 0.8,
            max_debt_ratio: 80.0,
            low_percentile: 40.0,
            stabilization_days: 2,
            volume_surge_ratio: 1.2,
            ..Self::standard()
        }
    }

    pub fn conservative() -> Self {
        Self {
            min_reports: 3,
            min_roe_improvement: 3.0,
            min_profit_growth: 10.0,
            min_cashflow_profit_ratio: 1.2,
            max_debt_ratio: 60.0,
            low_percentile: 20.0,
            stabilization_days: 4,
            volume_surge_ratio: 2.0,
            ..Self::standard()
        }
    }
}

impl ValidateConfig for DistressedReversalConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(self.min_reports >= 2, "min_reports must be at least 2")?;
        ensure(
            self.valuation_window > 0 && self.stabilization_days > 0 && self.volume_ma_period > 0,
            "distressed-reversal windows must be > 0",
        )?;
        ensure(
            self.low_percentile > 0.0 && self.low_percentile <= 100.0,
            "low_percentile must lie in (0, 100]",
        )?;
        ensure(
            self.max_debt_ratio > 0.0 && self.max_debt_ratio <= 100.0,
            "max_debt_ratio must lie in (0, 100]",
        )?;
        ensure(
            self.min_cashflow_profit_ratio >= 0.0 && self.volume_surge_ratio > 0.0,
            "ratios must be positive",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressedReversalResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub financial_score: f64,
    pub valuation_score: f64,
    pub technical_score: f64,
    pub roe_change: f64,
    pub cashflow_profit_ratio: f64,
    pub debt_ratio: f64,
    pub pe_percentile: Option<f64>,
    pub pb_percentile: Option<f64>,
    pub stable_days: usize,
    pub volume_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct DistressedReversalStrategy {
    config: DistressedReversalConfig,
}

impl DistressedReversalStrategy {
    pub fn new(config: DistressedReversalConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DistressedReversalConfig {
        &self.config
    }

    fn financial_score(&self, latest: &FinancialReport, previous: &FinancialReport) -> (f64, f64, f64) {
        let c = &self.config;
        let roe_change = latest.roe - previous.roe;
        let mut score = if roe_change >= c.min_roe_improvement {
            12.0
        } else if roe_change > 0.0 {
            6.0
        } else {
            0.0
        };

        let turned_profitable = previous.net_profit <= 0.0 && latest.net_profit > 0.0;
        if (latest.profit_growth >= c.min_profit_growth && latest.profit_growth > 0.0)
            || turned_profitable
        {
            score += 10.0;
        }

        let ratio = if latest.net_profit > 0.0 {
            latest.operating_cash_flow / latest.net_profit
        } else {
            0.0
        };
        if ratio >= c.min_cashflow_profit_ratio {
            score += 10.0;
        } else if ratio >= c.min_cashflow_profit_ratio / 2.0 {
            score += 5.0;
        }

        if latest.debt_ratio <= c.max_debt_ratio {
            score += 8.0;
        } else if latest.debt_ratio <= c.max_debt_ratio * 1.2 {
            score += 4.0;
        }
        (score, roe_change, ratio)
    }

    fn percentile_points(&self, percentile: Option<f64>) -> f64 {
        match percentile {
            Some(p) if p <= self.config.low_percentile => 15.0,
            Some(p) if p < 50.0 => 8.0,
            _ => 0.0,
        }
    }
}

/// Percent of the trailing `window` positive values strictly below the
/// latest one. `None` when the latest value is missing or non-positive.
pub fn valuation_percentile(
    valuations: &[Valuation],
    window: usize,
    metric: impl Fn(&Valuation) -> Option<f64>,
) -> Option<f64> {
    let current = metric(valuations.last()?).filter(|v| *v > 0.0)?;
    let history: Vec<f64> = valuations[valuations.len().saturating_sub(window)..]
        .iter()
        .filter_map(&metric)
        .filter(|v| *v > 0.0)
        .collect();
    let below = history.iter().filter(|v| **v < current).count();
    Some(below as f64 / history.len() as f64 * 100.0)
}

impl Strategy for DistressedReversalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DistressedReversal
    }

    fn required_bars(&self) -> usize {
        self.config.stabilization_days.max(self.config.volume_ma_period) + 1
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest_bar = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let reports = &series.financials;
        if reports.is_empty() {
            return Err(ScreenError::MissingFundamentals(series.code.clone()));
        }
        ScreenError::require(c.min_reports, reports.len())?;
        let (latest, previous) = (&reports[reports.len() - 1], &reports[reports.len() - 2]);

        let (financial_score, roe_change, cashflow_profit_ratio) =
            self.financial_score(latest, previous);

        let pe_percentile = valuation_percentile(&series.valuations, c.valuation_window, |v| v.pe);
        let pb_percentile = valuation_percentile(&series.valuations, c.valuation_window, |v| v.pb);
        let valuation_score =
            self.percentile_points(pe_percentile) + self.percentile_points(pb_percentile);

        let bars = &series.bars;
        let last = bars.len() - 1;
        let stable_days = (0..=last)
            .rev()
            .take_while(|&i| pct_change_at(bars, i) >= 0.0)
            .count();
        let stability = if stable_days >= c.stabilization_days {
            15.0
        } else {
            stable_days as f64 / c.stabilization_days as f64 * 15.0
        };
        let baseline = prior_volume_mean(bars, last, c.volume_ma_period)?;
        let volume_ratio = if baseline > 0.0 {
            latest_bar.volume / baseline
        } else {
            0.0
        };
        let volume_points = if volume_ratio >= c.volume_surge_ratio {
            15.0
        } else if volume_ratio >= 1.0 {
            7.0
        } else {
            0.0
        };
        let technical_score = stability + volume_points;

        let score = financial_score + valuation_score + technical_score;
        let expensive = [pe_percentile, pb_percentile]
            .iter()
            .flatten()
            .any(|p| *p >= HIGH_PERCENTILE);
        let mut risk = if latest.debt_ratio > c.max_debt_ratio {
            5
        } else if expensive {
            4
        } else {
            3
        };
        if financial_score >= 30.0 {
            risk -= 1;
        }

        debug!(
            code = %series.code,
            financial_score,
            valuation_score,
            technical_score,
            ?pe_percentile,
            ?pb_percentile,
            "distressed reversal evaluated"
        );

        let description = format!(
            "financial {financial_score:.0}/40 (ROE {roe_change:+.1}pp), valuation {valuation_score:.0}/30, technical {technical_score:.0}/30 ({stable_days} stable days, volume x{volume_ratio:.2})"
        );
        Ok(StrategyResult::DistressedReversal(DistressedReversalResult {
            header: ResultHeader::new(
                series,
                latest_bar,
                signal_from_score(score, &TIERS_80_65_50),
                score,
                risk,
                description,
            ),
            financial_score,
            valuation_score,
            technical_score,
            roe_change,
            cashflow_profit_ratio,
            debt_ratio: latest.debt_ratio,
            pe_percentile,
            pb_percentile,
            stable_days,
            volume_ratio,
        }))
    }
}
