//! SecuritySeries — one security's history as handed to a strategy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use crate::error::ScreenError;

/// One quarterly financial report. Ratios and growth rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialReport {
    /// Reporting period label, e.g. `2024Q3`.
    pub period: String,
    pub report_date: NaiveDate,
    pub revenue_growth: f64,
    pub profit_growth: f64,
    pub gross_margin: f64,
    pub net_margin: f64,
    pub roe: f64,
    pub debt_ratio: f64,
    pub operating_cash_flow: f64,
    pub net_profit: f64,
}

/// Daily valuation snapshot. Market cap is in units of 100M.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub date: NaiveDate,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub pb: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
}

/// A security code plus its ascending bar history and optional fundamentals.
///
/// Owned by the caller for the duration of an evaluation. Strategies only
/// borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySeries {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub financials: Vec<FinancialReport>,
    #[serde(default)]
    pub valuations: Vec<Valuation>,
}

impl SecuritySeries {
    pub fn new(code: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            code: code.into(),
            name: None,
            bars,
            financials: Vec::new(),
            valuations: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_financials(mut self, financials: Vec<FinancialReport>) -> Self {
        self.financials = financials;
        self
    }

    pub fn with_valuations(mut self, valuations: Vec<Valuation>) -> Self {
        self.valuations = valuations;
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn latest_financials(&self) -> Option<&FinancialReport> {
        self.financials.last()
    }

    pub fn latest_valuation(&self) -> Option<&Valuation> {
        self.valuations.last()
    }

    /// Check the ordering contract: bars strictly ascending by date, reports
    /// and valuations ascending.
    pub fn validate(&self) -> Result<(), ScreenError> {
        let fail = |reason: String| ScreenError::InvalidSeries {
            code: self.code.clone(),
            reason,
        };
        for pair in self.bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(fail(format!(
                    "bars not strictly ascending at {} -> {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        for pair in self.financials.windows(2) {
            if pair[1].report_date < pair[0].report_date {
                return Err(fail(format!(
                    "financial reports out of order at {}",
                    pair[1].period
                )));
            }
        }
        for pair in self.valuations.windows(2) {
            if pair[1].date < pair[0].date {
                return Err(fail(format!("valuations out of order at {}", pair[1].date)));
            }
        }
        Ok(())
    }

    /// Bars inside `[start, end]`, inclusive on both ends.
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> &[Bar] {
        let from = self.bars.partition_point(|b| b.date < start);
        let to = self.bars.partition_point(|b| b.date <= end);
        &self.bars[from..to.max(from)]
    }
}
