//! Low shadow — a long lower shadow printed near the bottom of the recent
//! range, read as buyers defending support.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    checked_latest, mean, signal_from_score, tail, ResultHeader, Strategy, StrategyResult,
    TIERS_80_65_50,
};
use crate::config::{ensure, StrategyKind, ValidateConfig};
use crate::domain::{SecuritySeries, StrategySignal};
use crate::error::ScreenError;
use crate::indicators::{highest_high, lowest_low};
use crate::pattern::CandleShape;

/// Lower-shadow ratio that earns full shadow credit.
const FULL_SHADOW: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LowShadowConfig {
    pub analysis_period: usize,
    pub min_lower_shadow_ratio: f64,
    /// Close must sit in the bottom fraction of the window's range.
    pub low_position_threshold: f64,
    pub min_body_ratio: f64,
    pub require_bullish: bool,
    pub min_volume_ratio: f64,
    pub max_upper_shadow_ratio: f64,
}

impl Default for LowShadowConfig {
    fn default() -> Self {
        Self {
            analysis_period: 20,
            min_lower_shadow_ratio: 0.4,
            low_position_threshold: 0.3,
            min_body_ratio: 0.1,
            require_bullish: true,
            min_volume_ratio: 1.2,
            max_upper_shadow_ratio: 0.2,
        }
    }
}

impl LowShadowConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn conservative() -> Self {
        Self {
            min_lower_shadow_ratio: 0.5,
            low_position_threshold: 0.25,
            require_bullish: true,
            min_volume_ratio: 1.5,
            ..Self::default()
        }
    }

    pub fn aggressive() -> Self {
        Self {
            min_lower_shadow_ratio: 0.3,
            low_position_threshold: 0.4,
            require_bullish: false,
            min_volume_ratio: 1.0,
            ..Self::default()
        }
    }
}

impl ValidateConfig for LowShadowConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        let within = |v: f64, lo: f64, hi: f64| (lo..=hi).contains(&v);
        ensure(self.analysis_period >= 5, "analysis_period must be at least 5")?;
        ensure(
            within(self.min_lower_shadow_ratio, 0.1, 0.8),
            "min_lower_shadow_ratio must lie in [0.1, 0.8]",
        )?;
        ensure(
            within(self.low_position_threshold, 0.1, 0.5),
            "low_position_threshold must lie in [0.1, 0.5]",
        )?;
        ensure(
            within(self.min_body_ratio, 0.05, 0.3),
            "min_body_ratio must lie in [0.05, 0.3]",
        )?;
        ensure(
            within(self.min_volume_ratio, 0.5, 5.0),
            "min_volume_ratio must lie in [0.5, 5.0]",
        )?;
        ensure(
            within(self.max_upper_shadow_ratio, 0.1, 0.5),
            "max_upper_shadow_ratio must lie in [0.1, 0.5]",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowShadowResult {
    #[serde(flatten)]
    pub header: ResultHeader,
    pub lower_shadow_ratio: f64,
    pub upper_shadow_ratio: f64,
    pub body_ratio: f64,
    pub price_position: f64,
    pub volume_ratio: f64,
    pub is_bullish: bool,
    /// 0..=100 estimate of how firmly the low was defended.
    pub support_strength: f64,
    /// Conditions that did not hold; empty when the pattern qualifies.
    pub failed_conditions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LowShadowStrategy {
    config: LowShadowConfig,
}

impl LowShadowStrategy {
    pub fn new(config: LowShadowConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LowShadowConfig {
        &self.config
    }
}

fn volume_credit(volume_ratio: f64) -> f64 {
    ((volume_ratio - 1.0) / 2.0).clamp(0.0, 1.0)
}

fn support_strength(shadow: f64, volume_ratio: f64, position: f64, bullish: bool) -> f64 {
    let score = (shadow / FULL_SHADOW).min(1.0) * 40.0
        + volume_credit(volume_ratio) * 25.0
        + (1.0 - position) * 20.0
        + if bullish { 15.0 } else { 0.0 };
    score.min(100.0)
}

impl Strategy for LowShadowStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LowShadow
    }

    fn required_bars(&self) -> usize {
        self.config.analysis_period
    }

    fn analyze(&self, series: &SecuritySeries) -> Result<StrategyResult, ScreenError> {
        let latest = checked_latest(series, self.required_bars())?;
        let c = &self.config;
        let window = tail(&series.bars, c.analysis_period);

        let shape = CandleShape::of(latest);
        let is_bullish = latest.is_bullish();
        let price_position = match (highest_high(window), lowest_low(window)) {
            (Some(hi), Some(lo)) if hi > lo => (latest.close - lo) / (hi - lo),
            _ => 0.5,
        };
        let avg_volume = mean(window.iter().map(|b| b.volume));
        let volume_ratio = if avg_volume > 0.0 {
            latest.volume / avg_volume
        } else {
            1.0
        };

        let mut failed = Vec::new();
        if shape.lower_ratio < c.min_lower_shadow_ratio {
            failed.push(format!(
                "lower shadow {:.0}% under {:.0}%",
                shape.lower_ratio * 100.0,
                c.min_lower_shadow_ratio * 100.0
            ));
        }
        if shape.upper_ratio > c.max_upper_shadow_ratio {
            failed.push(format!("upper shadow {:.0}% too long", shape.upper_ratio * 100.0));
        }
        if shape.body_ratio < c.min_body_ratio {
            failed.push(format!("body {:.0}% too small", shape.body_ratio * 100.0));
        }
        if price_position > c.low_position_threshold {
            failed.push(format!("position {:.0}% of range too high", price_position * 100.0));
        }
        if c.require_bullish && !is_bullish {
            failed.push("not a bullish close".to_string());
        }
        if volume_ratio < c.min_volume_ratio {
            failed.push(format!("volume x{volume_ratio:.2} too light"));
        }

        let support = support_strength(shape.lower_ratio, volume_ratio, price_position, is_bullish);
        let (signal, strength, risk, description) = if failed.is_empty() {
            let score = (shape.lower_ratio / FULL_SHADOW).min(1.0) * 30.0
                + volume_credit(volume_ratio) * 25.0
                + (1.0 - price_position) * 25.0
                + if is_bullish { 20.0 } else { 0.0 };
            let mut risk = if support >= 80.0 {
                2
            } else if support >= 60.0 {
                3
            } else {
                4
            };
            if price_position < 0.2 {
                risk -= 1;
            }
            (
                signal_from_score(score, &TIERS_80_65_50),
                score,
                risk,
                format!(
                    "lower shadow {:.0}% at {:.0}% of the {}-day range, volume x{volume_ratio:.2}",
                    shape.lower_ratio * 100.0,
                    price_position * 100.0,
                    c.analysis_period
                ),
            )
        } else {
            (StrategySignal::Hold, 0.0, 3, failed.join("; "))
        };

        debug!(
            code = %series.code,
            lower = shape.lower_ratio,
            price_position,
            volume_ratio,
            support,
            failed = failed.len(),
            "low shadow evaluated"
        );

        Ok(StrategyResult::LowShadow(LowShadowResult {
            header: ResultHeader::new(series, latest, signal, strength, risk, description),
            lower_shadow_ratio: shape.lower_ratio,
            upper_shadow_ratio: shape.upper_ratio,
            body_ratio: shape.body_ratio,
            price_position,
            volume_ratio,
            is_bullish,
            support_strength: support,
            failed_conditions: failed,
        }))
    }
}
