//! Fundamental screen — growth, profitability, leverage and valuation
//! thresholds applied to the latest financial report.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, signal_from_score, tier_at_least, ResultHeader, Strategy, StrategyResult,
    TIERS_80_60_40_20,
};
use crate::config::{ensure, ensure_ordered, StrategyKind, ValidateConfig};
use crate::domain::{SecuritySeries, StrategySignal};
use crate::error::ScreenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FundamentalConfig {
    pub min_revenue_growth: f64,
    pub min_profit_growth: f64,
    pub min_gross_margin: f64,
    pub min_net_margin: f64,
    pub min_roe: f64,
    pub max_debt_ratio: f64,
    pub require_positive_cash_flow: bool,
    pub min_pe: Option<f64>,
    pub max_pe: Option<f64>,
    /// PB bounds are informational: checked into `pb_in_range`, not scored.
    pub min_pb: Option<f64>,
    pub max_pb: Option<f64>,
    /// Market cap bounds in units of 100M.
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
}

impl Default for FundamentalConfig {
    fn default() -> Self {
        Self {
            min_revenue_growth: 10.0,
            min_profit_growth: 15.0,
            min_gross_margin: 20.0,
            min_net_margin: 5.0,
            min_roe: 10.0,
            max_debt_ratio: 70.0,
            require_positive_cash_flow: true,
            min_pe: Some(5.0),
            max_pe: Some(50.0),
            min_pb: Some(1.0),
            max_pb: Some(10.0),
            min_market_cap: None,
            max_market_cap: None,
        }
    }
}

impl FundamentalConfig {
    /// High-growth small caps (2B..10B).
    pub fn small_cap_tech_growth() -> Self {
        Self {
            min_revenue_growth: 40.0,
            min_profit_growth: 50.0,
            min_gross_margin: 40.0,
            min_net_margin: 15.0,
            min_roe: 20.0,
            max_debt_ratio: 40.0,
            require_positive_cash_flow: true,
            min_pe: Some(20.0),
            max_pe: Some(150.0),
            min_pb: Some(3.0),
            max_pb: Some(30.0),
            min_market_cap: Some(20.0),
            max_market_cap: Some(100.0),
        }
    }

    pub fn small_mid_cap_tech_growth() -> Self {
        Self {
            min_revenue_growth: 30.0,
            min_profit_growth: 35.0,
            min_gross_margin: 35.0,
            min_net_margin: 12.0,
            min_roe: 15.0,
            max_debt_ratio: 50.0,
            require_positive_cash_flow: true,
            min_pe: Some(15.0),
            max_pe: Some(120.0),
            min_pb: Some(2.5),
            max_pb: Some(25.0),
            min_market_cap: Some(20.0),
            max_market_cap: Some(200.0),
        }
    }

    pub fn potential_tech_growth() -> Self {
        Self {
            min_revenue_growth: 25.0,
            min_profit_growth: 30.0,
            min_gross_margin: 30.0,
            min_net_margin: 10.0,
            min_roe: 12.0,
            max_debt_ratio: 60.0,
            require_positive_cash_flow: true,
            min_pe: Some(10.0),
            max_pe: Some(100.0),
            min_pb: Some(2.0),
            max_pb: Some(20.0),
            min_market_cap: Some(10.0),
            max_market_cap: Some(150.0),
        }
    }

    pub fn mature_tech_growth() -> Self {
        Self {
            min_revenue_growth: 20.0,
            min_profit_growth: 25.0,
            min_gross_margin: 35.0,
            min_net_margin: 8.0,
            min_roe: 10.0,
            max_debt_ratio: 50.0,
            require_positive_cash_flow: true,
            min_pe: Some(15.0),
            max_pe: Some(80.0),
            min_pb: Some(2.0),
            max_pb: Some(15.0),
            min_market_cap: Some(50.0),
            max_market_cap: Some(500.0),
        }
    }

    fn pb_in_range(&self, pb: f64) -> bool {
        self.min_pb.map_or(true, |lo| pb >= lo) && self.max_pb.map_or(true, |hi| pb <= hi)
    }

    fn market_cap_in_range(&self, cap: f64) -> bool {
        self.min_market_cap.map_or(true, |lo| cap >= lo)
            && self.max_market_cap.map_or(true, |hi| cap <= hi)
    }
}

impl ValidateConfig for FundamentalConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure_ordered(self.min_pe, self.max_pe, "pe")?;
        ensure_ordered(self.min_pb, self.max_pb, "pb")?;
        ensure_ordered(self.min_market_cap, self.max_market_cap, "market_cap")?;
        ensure(
            self.max_debt_ratio > 0.0 && self.max_debt_ratio <= 100.0,
            "max_debt_ratio must lie in (0, 100]",
        )?;
        ensure(
            self.min_gross_margin >= 0.0 && self.min_net_margin >= 0.0,
            "margin thresholds must be >= 0",
        )
    }
}

/// Points earned per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalBreakdown {
    pub revenue_growth: f64,
    pub profit_growth: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
    pub roe: f64,
    pub cash_flow: f64,
    /// Valuation adjustment; may be negative.
    pub valuation: f64,
    /// Debt penalty; zero or negative.
    pub debt: f64,
}

impl FundamentalBreakdown {
    pub fn total(&self) -> f64 {
        self.revenue_growth
            + self.profit_growth
            + self.gross_margin
            + self.net_margin
            + self.roe
            + self.cash_flow
            + self.valuation
            + self.debt
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub report_period: String,
    pub revenue_growth: f64,
    pub profit_growth: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
    pub roe: f64,
    pub debt_ratio: f64,
    pub operating_cash_flow: f64,
    pub pe: Option<f64>,
    pub pb: Option<f64>,
    /// `None` without a PB value.
    pub pb_in_range: Option<bool>,
    pub market_cap: Option<f64>,
    pub breakdown: FundamentalBreakdown,
}

#[derive(Debug, Clone)]
pub struct FundamentalStrategy {
    config: FundamentalConfig,
}

impl FundamentalStrategy {
    pub fn new(config: FundamentalConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FundamentalConfig {
        &self.config
    }
}

impl Strategy for FundamentalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fundamental
    }

    fn required_bars(&self) -> usize {
        1
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let report = series
            .latest_financials()
            .ok_or_else(|| ScreenError::MissingFundamentals(series.code.clone()))?;
        let c = &self.config;
        let valuation = series.latest_valuation();
        let pe = valuation.and_then(|v| v.pe);
        let pb = valuation.and_then(|v| v.pb);
        let market_cap = valuation.and_then(|v| v.market_cap);

        let mut result = FundamentalResult {
            header: ResultHeader::new(series, latest, StrategySignal::Hold, 0.0, 3, ""),
            report_period: report.period.clone(),
            revenue_growth: report.revenue_growth,
            profit_growth: report.profit_growth,
            gross_margin: report.gross_margin,
            net_margin: report.net_margin,
            roe: report.roe,
            debt_ratio: report.debt_ratio,
            operating_cash_flow: report.operating_cash_flow,
            pe,
            pb,
            pb_in_range: pb.map(|pb| c.pb_in_range(pb)),
            market_cap,
            breakdown: FundamentalBreakdown::default(),
        };

        if let Some(cap) = market_cap.filter(|&cap| !c.market_cap_in_range(cap)) {
            debug!(code = %series.code, cap, "market cap outside range");
            result.header.analysis_description =
                format!("market cap {cap:.2} (100M) outside the configured range");
            return Ok(StrategyResult::Fundamental(result));
        }

        let mut b = FundamentalBreakdown {
            revenue_growth: tier_at_least(
                report.revenue_growth,
                &[
                    (c.min_revenue_growth * 2.0, 20.0),
                    (c.min_revenue_growth * 1.5, 15.0),
                    (c.min_revenue_growth, 10.0),
                ],
            ),
            profit_growth: tier_at_least(
                report.profit_growth,
                &[
                    (c.min_profit_growth * 2.0, 25.0),
                    (c.min_profit_growth * 1.5, 18.0),
                    (c.min_profit_growth, 12.0),
                ],
            ),
            gross_margin: tier_at_least(
                report.gross_margin,
                &[(c.min_gross_margin * 1.5, 15.0), (c.min_gross_margin, 10.0)],
            ),
            net_margin: tier_at_least(
                report.net_margin,
                &[(c.min_net_margin * 2.0, 15.0), (c.min_net_margin, 10.0)],
            ),
            roe: tier_at_least(report.roe, &[(c.min_roe * 1.5, 10.0), (c.min_roe, 6.0)]),
            ..FundamentalBreakdown::default()
        };

        let positive_cash_flow = report.operating_cash_flow > 0.0;
        b.cash_flow = if positive_cash_flow {
            10.0
        } else if !c.require_positive_cash_flow {
            5.0
        } else {
            0.0
        };

        if let (Some(pe), Some(lo), Some(hi)) = (pe, c.min_pe, c.max_pe) {
            if (lo..=hi).contains(&pe) {
                b.valuation = 5.0;
            } else if pe < lo || pe > hi * 1.5 {
                b.valuation = -10.0;
            }
        }

        let risk = if report.debt_ratio > c.max_debt_ratio {
            b.debt = -20.0;
            4
        } else if report.debt_ratio > c.max_debt_ratio * 0.8 {
            3
        } else {
            2
        };

        let score = b.total().clamp(0.0, 100.0);
        debug!(code = %series.code, period = %report.period, score, ?b, "fundamental evaluated");

        result.header = ResultHeader::new(
            series,
            latest,
            signal_from_score(score, &TIERS_80_60_40_20),
            score,
            risk,
            format!(
                "{}: revenue {:+.1}%, profit {:+.1}%, gross margin {:.1}%, ROE {:.1}%, debt {:.1}%",
                report.period,
                report.revenue_growth,
                report.profit_growth,
                report.gross_margin,
                report.roe,
                report.debt_ratio
            ),
        );
        result.breakdown = b;
        Ok(StrategyResult::Fundamental(result))
    }
}
