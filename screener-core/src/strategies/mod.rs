//! Strategy modules and the shared evaluation contract.
//!
//! Every strategy is a pure function of (series, config) behind the
//! [`Strategy`] trait. Results are a tagged union over per-strategy structs,
//! each carrying the common [`ResultHeader`].

pub mod bottom_volume_surge;
pub mod consecutive_strong;
pub mod distressed_reversal;
pub mod fundamental;
pub mod low_shadow;
pub mod price_strength;
pub mod price_volume;
pub mod single_limit_up;
pub mod turtle;
pub mod yearly_high;

pub use bottom_volume_surge::{BottomVolumeSurgeConfig, BottomVolumeSurgeResult, BottomVolumeSurgeStrategy};
pub use consecutive_strong::{ConsecutiveStrongConfig, ConsecutiveStrongResult, ConsecutiveStrongStrategy};
pub use distressed_reversal::{DistressedReversalConfig, DistressedReversalResult, DistressedReversalStrategy};
pub use fundamental::{FundamentalConfig, FundamentalResult, FundamentalStrategy};
pub use low_shadow::{LowShadowConfig, LowShadowResult, LowShadowStrategy};
pub use price_strength::{PriceStrengthConfig, PriceStrengthResult, PriceStrengthStrategy};
pub use price_volume::{PriceVolumeConfig, PriceVolumeResult, PriceVolumeStrategy};
pub use single_limit_up::{SingleLimitUpConfig, SingleLimitUpResult, SingleLimitUpStrategy};
pub use turtle::{TurtleConfig, TurtleResult, TurtleStrategy};
pub use yearly_high::{YearlyHighConfig, YearlyHighResult, YearlyHighStrategy};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::config::{StrategyConfig, StrategyKind, ValidateConfig};
use crate::domain::{Bar, SecuritySeries, StrategySignal};
use crate::error::ScreenError;

// ─── Trait ───────────────────────────────────────────────────────────

/// A configured screening strategy.
///
/// `analyze` is a pure function of the series and the strategy's config:
/// calling it twice on the same input yields identical results.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Minimum number of bars `analyze` needs.
    fn required_bars(&self) -> usize;

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError>;

    /// Evaluate every series; failures are collected, never propagated.
    fn batch_analyze(&self, universe: &[SecuritySeries]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for series in universe {
            outcome.evaluated += 1;
            match self.analyze(series) {
                Ok(result) => outcome.results.push(result),
                Err(error) => {
                    warn!(code = %series.code, strategy = %self.kind(), %error, "analysis failed");
                    outcome.errors.push(SecurityError {
                        code: series.code.clone(),
                        error,
                    });
                }
            }
        }
        outcome.sort();
        outcome
    }
}

/// Validate `config` and build the matching strategy.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, ScreenError> {
    config.validate()?;
    Ok(match config {
        StrategyConfig::Turtle(c) => Box::new(TurtleStrategy::new(c.clone())?),
        StrategyConfig::PriceVolumeCandlestick(c) => Box::new(PriceVolumeStrategy::new(c.clone())?),
        StrategyConfig::SingleLimitUp(c) => Box::new(SingleLimitUpStrategy::new(c.clone())?),
        StrategyConfig::Fundamental(c) => Box::new(FundamentalStrategy::new(c.clone())?),
        StrategyConfig::DistressedReversal(c) => {
            Box::new(DistressedReversalStrategy::new(c.clone())?)
        }
        StrategyConfig::BottomVolumeSurge(c) => Box::new(BottomVolumeSurgeStrategy::new(c.clone())?),
        StrategyConfig::LowShadow(c) => Box::new(LowShadowStrategy::new(c.clone())?),
        StrategyConfig::PriceStrength(c) => Box::new(PriceStrengthStrategy::new(c.clone())?),
        StrategyConfig::YearlyHigh(c) => Box::new(YearlyHighStrategy::new(c.clone())?),
        StrategyConfig::ConsecutiveStrong(c) => Box::new(ConsecutiveStrongStrategy::new(c.clone())?),
    })
}

// ─── Results ─────────────────────────────────────────────────────────

/// Fields every strategy result carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultHeader {
    pub stock_code: String,
    pub analysis_date: NaiveDate,
    pub current_price: f64,
    pub strategy_signal: StrategySignal,
    /// 0..=100
    pub signal_strength: u8,
    /// 1 (lowest) ..= 5 (highest)
    pub risk_level: u8,
    pub analysis_description: String,
}

impl ResultHeader {
    /// Header for the latest bar of `series`. Strength and risk are clamped
    /// into their ranges here so no strategy can emit an out-of-range value.
    pub(crate) fn new(
        series: &SecuritySeries,
        latest: &Bar,
        signal: StrategySignal,
        strength: f64,
        risk: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            stock_code: series.code.clone(),
            analysis_date: latest.date,
            current_price: latest.close,
            strategy_signal: signal,
            signal_strength: clamp_strength(strength),
            risk_level: clamp_risk(risk),
            analysis_description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyResult {
    Turtle(TurtleResult),
    PriceVolumeCandlestick(PriceVolumeResult),
    SingleLimitUp(SingleLimitUpResult),
    Fundamental(FundamentalResult),
    DistressedReversal(DistressedReversalResult),
    BottomVolumeSurge(BottomVolumeSurgeResult),
    LowShadow(LowShadowResult),
    PriceStrength(PriceStrengthResult),
    YearlyHigh(YearlyHighResult),
    ConsecutiveStrong(ConsecutiveStrongResult),
}

impl StrategyResult {
    pub fn header(&self) -> &ResultHeader {
        match self {
            Self::Turtle(r) => &r.header,
            Self::PriceVolumeCandlestick(r) => &r.header,
            Self::SingleLimitUp(r) => &r.header,
            Self::Fundamental(r) => &r.header,
            Self::DistressedReversal(r) => &r.header,
            Self::BottomVolumeSurge(r) => &r.header,
            Self::LowShadow(r) => &r.header,
            Self::PriceStrength(r) => &r.header,
            Self::YearlyHigh(r) => &r.header,
            Self::ConsecutiveStrong(r) => &r.header,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Turtle(_) => StrategyKind::Turtle,
            Self::PriceVolumeCandlestick(_) => StrategyKind::PriceVolumeCandlestick,
            Self::SingleLimitUp(_) => StrategyKind::SingleLimitUp,
            Self::Fundamental(_) => StrategyKind::Fundamental,
            Self::DistressedReversal(_) => StrategyKind::DistressedReversal,
            Self::BottomVolumeSurge(_) => StrategyKind::BottomVolumeSurge,
            Self::LowShadow(_) => StrategyKind::LowShadow,
            Self::PriceStrength(_) => StrategyKind::PriceStrength,
            Self::YearlyHigh(_) => StrategyKind::YearlyHigh,
            Self::ConsecutiveStrong(_) => StrategyKind::ConsecutiveStrong,
        }
    }

    pub fn stock_code(&self) -> &str {
        &self.header().stock_code
    }

    pub fn signal_strength(&self) -> u8 {
        self.header().signal_strength
    }

    pub fn strategy_signal(&self) -> StrategySignal {
        self.header().strategy_signal
    }

    pub fn risk_level(&self) -> u8 {
        self.header().risk_level
    }
}

/// Ranking order: strength descending, then code ascending.
pub fn rank_results(results: &mut [StrategyResult]) {
    results.sort_by(|a, b| {
        b.signal_strength()
            .cmp(&a.signal_strength())
            .then_with(|| a.stock_code().cmp(b.stock_code()))
    });
}

// ─── Batch outcome ───────────────────────────────────────────────────

/// One security that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityError {
    pub code: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: ScreenError,
}

fn serialize_display<S: Serializer>(error: &ScreenError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Ranked results.
    pub results: Vec<StrategyResult>,
    pub errors: Vec<SecurityError>,
    /// Number of series submitted.
    pub evaluated: usize,
}

impl BatchOutcome {
    /// Rank results and order errors by code.
    pub fn sort(&mut self) {
        rank_results(&mut self.results);
        self.errors.sort_by(|a, b| a.code.cmp(&b.code));
    }
}

// ─── Scoring helpers ─────────────────────────────────────────────────

/// Descending score thresholds mapped to signals, with a floor signal.
#[derive(Debug, Clone, Copy)]
pub struct SignalTable {
    pub steps: &'static [(f64, StrategySignal)],
    pub floor: StrategySignal,
}

/// ≥80 StrongBuy, ≥65 Buy, ≥50 Hold, else Sell.
pub const TIERS_80_65_50: SignalTable = SignalTable {
    steps: &[
        (80.0, StrategySignal::StrongBuy),
        (65.0, StrategySignal::Buy),
        (50.0, StrategySignal::Hold),
    ],
    floor: StrategySignal::Sell,
};

/// ≥80 StrongBuy, ≥60 Buy, ≥40 Hold, ≥20 Sell, else StrongSell.
pub const TIERS_80_60_40_20: SignalTable = SignalTable {
    steps: &[
        (80.0, StrategySignal::StrongBuy),
        (60.0, StrategySignal::Buy),
        (40.0, StrategySignal::Hold),
        (20.0, StrategySignal::Sell),
    ],
    floor: StrategySignal::StrongSell,
};

pub fn signal_from_score(score: f64, table: &SignalTable) -> StrategySignal {
    table
        .steps
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map(|(_, signal)| *signal)
        .unwrap_or(table.floor)
}

/// Round into 0..=100. NaN maps to 0.
pub fn clamp_strength(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

pub fn clamp_risk(risk: i32) -> u8 {
    risk.clamp(1, 5) as u8
}

/// Points of the first step whose threshold `value` reaches (`>=`).
pub(crate) fn tier_at_least(value: f64, steps: &[(f64, f64)]) -> f64 {
    steps
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map_or(0.0, |(_, points)| *points)
}

/// Points of the first step whose threshold `value` strictly exceeds.
pub(crate) fn tier_above(value: f64, steps: &[(f64, f64)]) -> f64 {
    steps
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map_or(0.0, |(_, points)| *points)
}

/// Validate the series and require `required` bars; returns the latest bar.
pub(crate) fn checked_latest(
    series: &SecuritySeries,
    required: usize,
) -> Result<&Bar, ScreenError> {
    series.validate()?;
    ScreenError::require(required.max(1), series.len())?;
    series
        .latest_bar()
        .ok_or(ScreenError::InsufficientData {
            required: required.max(1),
            actual: 0,
        })
}

/// The trailing `n` bars (all of them when fewer exist).
pub(crate) fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
