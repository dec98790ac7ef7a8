//! Price-volume candlestick — candle shape, volume reaction and short trend
//! combined through a fixed rule table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{checked_latest, mean, tail, ResultHeader, Strategy, StrategyResult};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{pct_change_at, SecuritySeries, StrategySignal};
use crate::error::ScreenError;
use crate::indicators::{last_defined, prior_volume_mean, IndicatorSet};
use crate::pattern::{classify, CandlePattern, PatternThresholds};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceVolumeConfig {
    pub analysis_period: usize,
    pub volume_ma_period: usize,
    /// Close-price coefficient of variation (%) above which the series is
    /// flagged as highly volatile.
    pub price_volatility_threshold: f64,
    pub volume_amplification_threshold: f64,
    /// Body size as percent of the open that marks a large candle.
    pub body_threshold: f64,
    pub patterns: PatternThresholds,
}

impl Default for PriceVolumeConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PriceVolumeConfig {
    pub fn standard() -> Self {
        Self {
            analysis_period: 20,
            volume_ma_period: 5,
            price_volatility_threshold: 3.0,
            volume_amplification_threshold: 1.5,
            body_threshold: 2.0,
            patterns: PatternThresholds::default(),
        }
    }

    pub fn conservative() -> Self {
        Self {
            analysis_period: 30,
            volume_ma_period: 10,
            price_volatility_threshold: 2.0,
            volume_amplification_threshold: 1.2,
            body_threshold: 1.5,
            patterns: PatternThresholds::default(),
        }
    }

    pub fn aggressive() -> Self {
        Self {
            analysis_period: 10,
            volume_ma_period: 3,
            price_volatility_threshold: 5.0,
            volume_amplification_threshold: 2.5,
            body_threshold: 3.0,
            patterns: PatternThresholds::default(),
        }
    }
}

impl ValidateConfig for PriceVolumeConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        ensure(
            self.analysis_period > 0 && self.volume_ma_period > 0,
            "price-volume periods must be > 0",
        )?;
        ensure(
            self.price_volatility_threshold > 0.0,
            "price_volatility_threshold must be > 0",
        )?;
        ensure(
            self.volume_amplification_threshold > 0.0,
            "volume_amplification_threshold must be > 0",
        )?;
        ensure(self.body_threshold >= 0.0, "body_threshold must be >= 0")?;
        self.patterns.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSignal {
    VolumeUptrend,
    VolumeDowntrend,
    AbnormalVolume,
    LowVolumeUptrend,
    LowVolumeDowntrend,
    Normal,
}

impl VolumeSignal {
    /// Classify from the volume ratio and today's percent change.
    pub fn from_ratio(ratio: f64, change_pct: f64, amplification: f64) -> Self {
        if ratio > amplification {
            if change_pct > 2.0 {
                Self::VolumeUptrend
            } else if change_pct < -2.0 {
                Self::VolumeDowntrend
            } else {
                Self::AbnormalVolume
            }
        } else if ratio < 0.8 {
            if change_pct > 1.0 {
                Self::LowVolumeUptrend
            } else if change_pct < -1.0 {
                Self::LowVolumeDowntrend
            } else {
                Self::Normal
            }
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortTrend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceVolumeResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub candlestick_pattern: CandlePattern,
    pub volume_signal: VolumeSignal,
    pub short_trend: ShortTrend,
    pub buy_score: f64,
    pub sell_score: f64,
    pub price_change_pct: f64,
    /// Coefficient of variation of closes over the period, in percent.
    pub price_volatility: f64,
    pub volume_ratio: f64,
    pub is_high_volatility: bool,
    pub is_large_body: bool,
}

#[derive(Debug, Clone)]
pub struct PriceVolumeStrategy {
    config: PriceVolumeConfig,
}

impl PriceVolumeStrategy {
    pub fn new(config: PriceVolumeConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PriceVolumeConfig {
        &self.config
    }
}

/// (buy, sell) points contributed by each observation.
fn rule_points(pattern: CandlePattern, volume: VolumeSignal, trend: ShortTrend) -> (f64, f64) {
    let (mut buy, mut sell) = match pattern {
        CandlePattern::Hammer | CandlePattern::InvertedHammer => (30.0, 0.0),
        CandlePattern::LongBullish => (25.0, 0.0),
        CandlePattern::SmallBullish => (10.0, 0.0),
        CandlePattern::HangingMan | CandlePattern::ShootingStar => (0.0, 30.0),
        CandlePattern::LongBearish => (0.0, 25.0),
        CandlePattern::SmallBearish => (0.0, 10.0),
        CandlePattern::Doji => (0.0, 0.0),
    };
    match volume {
        VolumeSignal::VolumeUptrend => buy += 35.0,
        VolumeSignal::LowVolumeUptrend => buy += 15.0,
        VolumeSignal::VolumeDowntrend => sell += 35.0,
        VolumeSignal::LowVolumeDowntrend => sell += 15.0,
        VolumeSignal::AbnormalVolume => sell += 10.0,
        VolumeSignal::Normal => {}
    }
    match trend {
        ShortTrend::Up => buy += 20.0,
        ShortTrend::Down => sell += 20.0,
        ShortTrend::Flat => {}
    }
    (buy, sell)
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values.iter().copied());
    if values.is_empty() || avg == 0.0 {
        return 0.0;
    }
    let variance = mean(values.iter().map(|v| (v - avg).powi(2)));
    variance.sqrt() / avg * 100.0
}

impl Strategy for PriceVolumeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PriceVolumeCandlestick
    }

    fn required_bars(&self) -> usize {
        self.config
            .analysis_period
            .max(self.config.volume_ma_period + 1)
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let bars = &series.bars;
        let last = bars.len() - 1;

        let pattern = classify(latest, &c.patterns);
        let change = pct_change_at(bars, last);
        let baseline = prior_volume_mean(bars, last, c.volume_ma_period)?;
        let volume_ratio = if baseline > 0.0 {
            latest.volume / baseline
        } else {
            1.0
        };
        let volume_signal =
            VolumeSignal::from_ratio(volume_ratio, change, c.volume_amplification_threshold);

        // MA5 against MA20; flat while MA20 is still undefined
        let indicators = IndicatorSet::compute(bars);
        let fast = last_defined(&indicators.ma5);
        let slow = last_defined(&indicators.ma20);
        let short_trend = match (fast, slow) {
            (Some(f), Some(s)) if f > s => ShortTrend::Up,
            (Some(f), Some(s)) if f < s => ShortTrend::Down,
            _ => ShortTrend::Flat,
        };

        let closes: Vec<f64> = tail(bars, c.analysis_period).iter().map(|b| b.close).collect();
        let price_volatility = coefficient_of_variation(&closes);
        let is_large_body = latest.open > 0.0 && latest.body() / latest.open * 100.0 >= c.body_threshold;

        let (buy_score, sell_score) = rule_points(pattern, volume_signal, short_trend);
        let strength = buy_score.max(sell_score).min(100.0);
        let net = buy_score - sell_score;
        let (signal, risk) = if net >= 50.0 {
            (StrategySignal::StrongBuy, 3)
        } else if net >= 20.0 {
            (StrategySignal::Buy, 2)
        } else if net <= -50.0 {
            (StrategySignal::StrongSell, 4)
        } else if net <= -20.0 {
            (StrategySignal::Sell, 3)
        } else {
            (StrategySignal::Hold, 2)
        };

        debug!(
            code = %series.code,
            ?pattern,
            ?volume_signal,
            ?short_trend,
            buy_score,
            sell_score,
            "price-volume evaluated"
        );

        let description = format!(
            "{pattern:?} candle, {volume_signal:?} (volume x{volume_ratio:.2}, change {change:.2}%), short trend {short_trend:?}"
        );
        Ok(StrategyResult::PriceVolumeCandlestick(PriceVolumeResult {
            header: ResultHeader::new(series, latest, signal, strength, risk, description),
            candlestick_pattern: pattern,
            volume_signal,
            short_trend,
            buy_score,
            sell_score,
            price_change_pct: change,
            price_volatility,
            volume_ratio,
            is_high_volatility: price_volatility > c.price_volatility_threshold,
            is_large_body,
        }))
    }
}
