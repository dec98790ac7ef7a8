//! Strategy configuration — the tagged union of every strategy's parameters.
//!
//! - `StrategyKind`: the ten strategy names.
//! - `StrategyConfig`: one variant per strategy wrapping its config struct.
//! - `fingerprint()`: BLAKE3 over the canonical JSON, identifying a run's
//!   exact parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScreenError;
use crate::strategies::{
    BottomVolumeSurgeConfig, ConsecutiveStrongConfig, DistressedReversalConfig, FundamentalConfig,
    LowShadowConfig, PriceStrengthConfig, PriceVolumeConfig, SingleLimitUpConfig, TurtleConfig,
    YearlyHighConfig,
};

/// Validation shared by every config struct.
pub trait ValidateConfig {
    fn validate(&self) -> Result<(), ScreenError>;
}

/// `Err(InvalidConfig)` unless `cond` holds.
pub(crate) fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), ScreenError> {
    if cond {
        Ok(())
    } else {
        Err(ScreenError::InvalidConfig(msg.into()))
    }
}

/// `min <= max` when both bounds are set.
pub(crate) fn ensure_ordered(
    min: Option<f64>,
    max: Option<f64>,
    what: &str,
) -> Result<(), ScreenError> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(ScreenError::InvalidConfig(format!(
            "min_{what} ({lo}) must not exceed max_{what} ({hi})"
        ))),
        _ => Ok(()),
    }
}

// ─── Strategy kind ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Turtle,
    PriceVolumeCandlestick,
    SingleLimitUp,
    Fundamental,
    DistressedReversal,
    BottomVolumeSurge,
    LowShadow,
    PriceStrength,
    YearlyHigh,
    ConsecutiveStrong,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 10] = [
        Self::Turtle,
        Self::PriceVolumeCandlestick,
        Self::SingleLimitUp,
        Self::Fundamental,
        Self::DistressedReversal,
        Self::BottomVolumeSurge,
        Self::LowShadow,
        Self::PriceStrength,
        Self::YearlyHigh,
        Self::ConsecutiveStrong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Turtle => "turtle",
            Self::PriceVolumeCandlestick => "price_volume_candlestick",
            Self::SingleLimitUp => "single_limit_up",
            Self::Fundamental => "fundamental",
            Self::DistressedReversal => "distressed_reversal",
            Self::BottomVolumeSurge => "bottom_volume_surge",
            Self::LowShadow => "low_shadow",
            Self::PriceStrength => "price_strength",
            Self::YearlyHigh => "yearly_high",
            Self::ConsecutiveStrong => "consecutive_strong",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Turtle => "Donchian breakout with ATR stops and pyramid levels",
            Self::PriceVolumeCandlestick => "candlestick pattern plus volume and short trend",
            Self::SingleLimitUp => "exactly one limit-up day inside a rising window",
            Self::Fundamental => "growth, margin, ROE, debt and valuation thresholds",
            Self::DistressedReversal => "improving financials, cheap valuation, stabilizing price",
            Self::BottomVolumeSurge => "volume surge lifting price off a consolidation bottom",
            Self::LowShadow => "long lower shadow at a low price position",
            Self::PriceStrength => "per-day candle strength averaged over a window",
            Self::YearlyHigh => "new high for the calendar year",
            Self::ConsecutiveStrong => "run of consecutive strong closes",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ScreenError::UnsupportedStrategy(s.to_string()))
    }
}

// ─── Strategy config ─────────────────────────────────────────────────

/// Concrete configuration for one strategy.
///
/// Serialized adjacently tagged: `{"strategy": "turtle", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "params", rename_all = "snake_case")]
pub enum StrategyConfig {
    Turtle(TurtleConfig),
    PriceVolumeCandlestick(PriceVolumeConfig),
    SingleLimitUp(SingleLimitUpConfig),
    Fundamental(FundamentalConfig),
    DistressedReversal(DistressedReversalConfig),
    BottomVolumeSurge(BottomVolumeSurgeConfig),
    LowShadow(LowShadowConfig),
    PriceStrength(PriceStrengthConfig),
    YearlyHigh(YearlyHighConfig),
    ConsecutiveStrong(ConsecutiveStrongConfig),
}

impl StrategyConfig {
    /// The strategy's documented defaults.
    pub fn default_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Turtle => Self::Turtle(TurtleConfig::default()),
            StrategyKind::PriceVolumeCandlestick => {
                Self::PriceVolumeCandlestick(PriceVolumeConfig::default())
            }
            StrategyKind::SingleLimitUp => Self::SingleLimitUp(SingleLimitUpConfig::default()),
            StrategyKind::Fundamental => Self::Fundamental(FundamentalConfig::default()),
            StrategyKind::DistressedReversal => {
                Self::DistressedReversal(DistressedReversalConfig::default())
            }
            StrategyKind::BottomVolumeSurge => {
                Self::BottomVolumeSurge(BottomVolumeSurgeConfig::default())
            }
            StrategyKind::LowShadow => Self::LowShadow(LowShadowConfig::default()),
            StrategyKind::PriceStrength => Self::PriceStrength(PriceStrengthConfig::default()),
            StrategyKind::YearlyHigh => Self::YearlyHigh(YearlyHighConfig::default()),
            StrategyKind::ConsecutiveStrong => {
                Self::ConsecutiveStrong(ConsecutiveStrongConfig::default())
            }
        }
    }

    /// Strictly deserialize a parameter object into `kind`'s config shape.
    /// Unknown fields are rejected; missing fields take defaults.
    pub fn from_params(kind: StrategyKind, params: serde_json::Value) -> Result<Self, ScreenError> {
        fn parse<T: serde::de::DeserializeOwned>(
            kind: StrategyKind,
            params: serde_json::Value,
        ) -> Result<T, ScreenError> {
            serde_json::from_value(params)
                .map_err(|e| ScreenError::InvalidConfig(format!("{kind} settings: {e}")))
        }

        Ok(match kind {
            StrategyKind::Turtle => Self::Turtle(parse(kind, params)?),
            StrategyKind::PriceVolumeCandlestick => {
                Self::PriceVolumeCandlestick(parse(kind, params)?)
            }
            StrategyKind::SingleLimitUp => Self::SingleLimitUp(parse(kind, params)?),
            StrategyKind::Fundamental => Self::Fundamental(parse(kind, params)?),
            StrategyKind::DistressedReversal => Self::DistressedReversal(parse(kind, params)?),
            StrategyKind::BottomVolumeSurge => Self::BottomVolumeSurge(parse(kind, params)?),
            StrategyKind::LowShadow => Self::LowShadow(parse(kind, params)?),
            StrategyKind::PriceStrength => Self::PriceStrength(parse(kind, params)?),
            StrategyKind::YearlyHigh => Self::YearlyHigh(parse(kind, params)?),
            StrategyKind::ConsecutiveStrong => Self::ConsecutiveStrong(parse(kind, params)?),
        })
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

    /// Serialize just the parameter object (no strategy tag).
    pub fn params_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("params").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }

    /// Exact identity: BLAKE3 of the canonical JSON (fixed field order).
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

impl ValidateConfig for StrategyConfig {
    fn validate(&self) -> Result<(), ScreenError> {
        match self {
            Self::Turtle(c) => c.validate(),
            Self::PriceVolumeCandlestick(c) => c.validate(),
            Self::SingleLimitUp(c) => c.validate(),
            Self::Fundamental(c) => c.validate(),
            Self::DistressedReversal(c) => c.validate(),
            Self::BottomVolumeSurge(c) => c.validate(),
            Self::LowShadow(c) => c.validate(),
            Self::PriceStrength(c) => c.validate(),
            Self::YearlyHigh(c) => c.validate(),
            Self::ConsecutiveStrong(c) => c.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>(), Ok(kind));
        }
        assert_eq!(
            "martingale".parse::<StrategyKind>(),
            Err(ScreenError::UnsupportedStrategy("martingale".into()))
        );
    }

    #[test]
    fn every_default_validates() {
        for kind in StrategyKind::ALL {
            let config = StrategyConfig::default_for(kind);
            assert_eq!(config.kind(), kind);
            assert!(config.validate().is_ok(), "{kind} default should validate");
        }
    }

    #[test]
    fn from_params_fills_missing_fields_with_defaults() {
        let config =
            StrategyConfig::from_params(StrategyKind::Turtle, json!({"entry_breakout_period": 30}))
                .unwrap();
        match config {
            StrategyConfig::Turtle(c) => {
                assert_eq!(c.entry_breakout_period, 30);
                assert_eq!(c.exit_breakout_period, TurtleConfig::default().exit_breakout_period);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn from_params_rejects_unknown_fields() {
        let err = StrategyConfig::from_params(StrategyKind::LowShadow, json!({"colour": "red"}))
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidConfig(_)));
    }

    #[test]
    fn fingerprint_tracks_parameter_values() {
        let a = StrategyConfig::default_for(StrategyKind::Turtle);
        let b = StrategyConfig::Turtle(TurtleConfig::system2());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn serialized_shape_is_adjacently_tagged() {
        let config = StrategyConfig::default_for(StrategyKind::YearlyHigh);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["strategy"], "yearly_high");
        assert_eq!(config.params_json()["recent_days"], 1);
    }
}
