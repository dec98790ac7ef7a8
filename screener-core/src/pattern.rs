//! Candlestick pattern classifier.
//!
//! Classifies a single bar from its body and shadow ratios. The first
//! matching rule wins: Doji, long body, hammer family, inverted-hammer
//! family, then small body as the fallback.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::ScreenError;

/// Ratio thresholds, all relative to the bar's high-low range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternThresholds {
    /// Body/range below this is a Doji.
    pub doji_body_ratio: f64,
    /// Body/range above this is a long candle.
    pub long_body_ratio: f64,
    /// Dominant shadow/range above this marks a hammer-type candle.
    pub shadow_ratio: f64,
    /// Opposite shadow/range must stay below this for hammer-type candles.
    pub opposite_shadow_max: f64,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            doji_body_ratio: 0.1,
            long_body_ratio: 0.7,
            shadow_ratio: 0.6,
            opposite_shadow_max: 0.1,
        }
    }
}

impl PatternThresholds {
    pub fn validate(&self) -> Result<(), ScreenError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(self.doji_body_ratio)
            && in_unit(self.long_body_ratio)
            && in_unit(self.shadow_ratio)
            && in_unit(self.opposite_shadow_max))
        {
            return Err(ScreenError::invalid(
                "pattern ratios must lie in [0, 1]",
            ));
        }
        if self.doji_body_ratio > self.long_body_ratio {
            return Err(ScreenError::invalid(
                "doji body ratio must not exceed long body ratio",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    Doji,
    LongBullish,
    LongBearish,
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    SmallBullish,
    SmallBearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBias {
    Bullish,
    Bearish,
    Neutral,
}

impl CandlePattern {
    pub fn bias(self) -> PatternBias {
        match self {
            Self::LongBullish | Self::Hammer | Self::InvertedHammer | Self::SmallBullish => {
                PatternBias::Bullish
            }
            Self::LongBearish | Self::HangingMan | Self::ShootingStar | Self::SmallBearish => {
                PatternBias::Bearish
            }
            Self::Doji => PatternBias::Neutral,
        }
    }
}

/// Shape ratios of one bar. All zero for a zero-range bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleShape {
    pub body_ratio: f64,
    pub upper_ratio: f64,
    pub lower_ratio: f64,
}

impl CandleShape {
    pub fn of(bar: &Bar) -> Self {
        let range = bar.range();
        if range <= 0.0 {
            return Self {
                body_ratio: 0.0,
                upper_ratio: 0.0,
                lower_ratio: 0.0,
            };
        }
        Self {
            body_ratio: bar.body() / range,
            upper_ratio: bar.upper_shadow() / range,
            lower_ratio: bar.lower_shadow() / range,
        }
    }
}

pub fn classify(bar: &Bar, t: &PatternThresholds) -> CandlePattern {
    if bar.range() <= 0.0 {
        return CandlePattern::Doji;
    }
    let shape = CandleShape::of(bar);
    let bullish = bar.is_bullish();

    if shape.body_ratio < t.doji_body_ratio {
        return CandlePattern::Doji;
    }
    if shape.body_ratio > t.long_body_ratio {
        return if bullish {
            CandlePattern::LongBullish
        } else {
            CandlePattern::LongBearish
        };
    }
    if shape.lower_ratio > t.shadow_ratio && shape.upper_ratio < t.opposite_shadow_max {
        return if bullish {
            CandlePattern::Hammer
        } else {
            CandlePattern::HangingMan
        };
    }
    if shape.upper_ratio > t.shadow_ratio && shape.lower_ratio < t.opposite_shadow_max {
        return if bullish {
            CandlePattern::InvertedHammer
        } else {
            CandlePattern::ShootingStar
        };
    }
    if bar.close >= bar.open {
        CandlePattern::SmallBullish
    } else {
        CandlePattern::SmallBearish
    }
}
