//! Named parameter presets and the settings resolver.
//!
//! A request names a strategy and optionally carries settings: nothing (the
//! defaults), `{"preset": "<name>"}`, or a partial parameter object. All
//! three paths end in a validated `StrategyConfig`.

use serde_json::Value;

use crate::config::{StrategyConfig, StrategyKind, ValidateConfig};
use crate::error::ScreenError;
use crate::strategies::{
    BottomVolumeSurgeConfig, ConsecutiveStrongConfig, DistressedReversalConfig, FundamentalConfig,
    LowShadowConfig, PriceStrengthConfig, PriceVolumeConfig, TurtleConfig,
};

pub type PresetFn = fn() -> StrategyConfig;

/// Lookup table from strategy to its named presets, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    entries: Vec<(StrategyKind, &'static str, PresetFn)>,
}

impl PresetRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every preset shipped with the library.
    pub fn builtin() -> Self {
        use StrategyKind as K;
        let mut r = Self::empty();

        r.register(K::Turtle, "system1", || StrategyConfig::Turtle(TurtleConfig::system1()));
        r.register(K::Turtle, "system2", || StrategyConfig::Turtle(TurtleConfig::system2()));
        r.register(K::Turtle, "conservative", || {
            StrategyConfig::Turtle(TurtleConfig::conservative())
        });
        r.register(K::Turtle, "aggressive", || {
            StrategyConfig::Turtle(TurtleConfig::aggressive())
        });

        r.register(K::PriceVolumeCandlestick, "standard", || {
            StrategyConfig::PriceVolumeCandlestick(PriceVolumeConfig::standard())
        });
        r.register(K::PriceVolumeCandlestick, "conservative", || {
            StrategyConfig::PriceVolumeCandlestick(PriceVolumeConfig::conservative())
        });
        r.register(K::PriceVolumeCandlestick, "aggressive", || {
            StrategyConfig::PriceVolumeCandlestick(PriceVolumeConfig::aggressive())
        });

        r.register(K::Fundamental, "small_cap_tech_growth", || {
            StrategyConfig::Fundamental(FundamentalConfig::small_cap_tech_growth())
        });
        r.register(K::Fundamental, "small_mid_cap_tech_growth", || {
            StrategyConfig::Fundamental(FundamentalConfig::small_mid_cap_tech_growth())
        });
        r.register(K::Fundamental, "potential_tech_growth", || {
            StrategyConfig::Fundamental(FundamentalConfig::potential_tech_growth())
        });
        r.register(K::Fundamental, "mature_tech_growth", || {
            StrategyConfig::Fundamental(FundamentalConfig::mature_tech_growth())
        });

        r.register(K::DistressedReversal, "standard", || {
            StrategyConfig::DistressedReversal(DistressedReversalConfig::standard())
        });
        r.register(K::DistressedReversal, "aggressive", || {
            StrategyConfig::DistressedReversal(DistressedReversalConfig::aggressive())
        });
        r.register(K::DistressedReversal, "conservative", || {
            StrategyConfig::DistressedReversal(DistressedReversalConfig::conservative())
        });

        r.register(K::BottomVolumeSurge, "standard", || {
            StrategyConfig::BottomVolumeSurge(BottomVolumeSurgeConfig::standard())
        });
        r.register(K::BottomVolumeSurge, "conservative", || {
            StrategyConfig::BottomVolumeSurge(BottomVolumeSurgeConfig::conservative())
        });
        r.register(K::BottomVolumeSurge, "aggressive", || {
            StrategyConfig::BottomVolumeSurge(BottomVolumeSurgeConfig::aggressive())
        });

        r.register(K::LowShadow, "standard", || {
            StrategyConfig::LowShadow(LowShadowConfig::standard())
        });
        r.register(K::LowShadow, "conservative", || {
            StrategyConfig::LowShadow(LowShadowConfig::conservative())
        });
        r.register(K::LowShadow, "aggressive", || {
            StrategyConfig::LowShadow(LowShadowConfig::aggressive())
        });

        r.register(K::PriceStrength, "standard", || {
            StrategyConfig::PriceStrength(PriceStrengthConfig::standard())
        });
        r.register(K::PriceStrength, "conservative", || {
            StrategyConfig::PriceStrength(PriceStrengthConfig::conservative())
        });
        r.register(K::PriceStrength, "aggressive", || {
            StrategyConfig::PriceStrength(PriceStrengthConfig::aggressive())
        });

        r.register(K::ConsecutiveStrong, "three_days", || {
            StrategyConfig::ConsecutiveStrong(ConsecutiveStrongConfig::three_days())
        });
        r.register(K::ConsecutiveStrong, "five_days", || {
            StrategyConfig::ConsecutiveStrong(ConsecutiveStrongConfig::five_days())
        });
        r.register(K::ConsecutiveStrong, "ten_days", || {
            StrategyConfig::ConsecutiveStrong(ConsecutiveStrongConfig::ten_days())
        });
        r.register(K::ConsecutiveStrong, "relaxed", || {
            StrategyConfig::ConsecutiveStrong(ConsecutiveStrongConfig::relaxed())
        });

        r
    }

    /// Add or replace a preset.
    pub fn register(&mut self, kind: StrategyKind, name: &'static str, build: PresetFn) {
        match self.entries.iter_mut().find(|(k, n, _)| *k == kind && *n == name) {
            Some(entry) => entry.2 = build,
            None => self.entries.push((kind, name, build)),
        }
    }

    pub fn get(&self, kind: StrategyKind, name: &str) -> Option<StrategyConfig> {
        self.entries
            .iter()
            .find(|(k, n, _)| *k == kind && *n == name)
            .map(|(_, _, build)| build())
    }

    pub fn preset_names(&self, kind: StrategyKind) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, n, _)| *n)
            .collect()
    }

    /// Turn optional request settings into a validated config.
    pub fn resolve(
        &self,
        kind: StrategyKind,
        settings: Option<&Value>,
    ) -> Result<StrategyConfig, ScreenError> {
        let config = match settings {
            None | Some(Value::Null) => StrategyConfig::default_for(kind),
            Some(Value::Object(map)) if map.contains_key("preset") => {
                if map.len() > 1 {
                    return Err(ScreenError::InvalidConfig(
                        "`preset` cannot be combined with other settings".into(),
                    ));
                }
                let name = map
                    .get("preset")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ScreenError::InvalidConfig("`preset` must be a string".into()))?;
                self.get(kind, name)
                    .ok_or_else(|| ScreenError::UnsupportedPreset {
                        strategy: kind.to_string(),
                        preset: name.to_string(),
                    })?
            }
            Some(params) => StrategyConfig::from_params(kind, params.clone())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Like [`resolve`](Self::resolve), taking the strategy by name.
    pub fn resolve_by_name(
        &self,
        strategy: &str,
        settings: Option<&Value>,
    ) -> Result<StrategyConfig, ScreenError> {
        let kind: StrategyKind = strategy.parse()?;
        self.resolve(kind, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_settings_resolve_to_defaults() {
        let registry = PresetRegistry::builtin();
        for kind in StrategyKind::ALL {
            assert_eq!(registry.resolve(kind, None).unwrap(), StrategyConfig::default_for(kind));
            assert_eq!(
                registry.resolve(kind, Some(&Value::Null)).unwrap(),
                StrategyConfig::default_for(kind)
            );
        }
    }

    #[test]
    fn every_builtin_preset_validates() {
        let registry = PresetRegistry::builtin();
        for kind in StrategyKind::ALL {
            for name in registry.preset_names(kind) {
                let config = registry.resolve(kind, Some(&json!({ "preset": name }))).unwrap();
                assert_eq!(config.kind(), kind, "{kind}/{name}");
            }
        }
    }

    #[test]
    fn named_preset_is_looked_up() {
        let registry = PresetRegistry::builtin();
        let config = registry
            .resolve_by_name("turtle", Some(&json!({ "preset": "system2" })))
            .unwrap();
        assert_eq!(config, StrategyConfig::Turtle(TurtleConfig::system2()));
    }

    #[test]
    fn unknown_preset_is_unsupported() {
        let registry = PresetRegistry::builtin();
        let err = registry
            .resolve(StrategyKind::Turtle, Some(&json!({ "preset": "moonshot" })))
            .unwrap_err();
        assert_eq!(
            err,
            ScreenError::UnsupportedPreset {
                strategy: "turtle".into(),
                preset: "moonshot".into()
            }
        );
    }

    #[test]
    fn strategies_without_presets_reject_any_name() {
        let registry = PresetRegistry::builtin();
        for kind in [StrategyKind::SingleLimitUp, StrategyKind::YearlyHigh] {
            assert!(registry.preset_names(kind).is_empty());
            let err = registry
                .resolve(kind, Some(&json!({ "preset": "standard" })))
                .unwrap_err();
            assert!(matches!(err, ScreenError::UnsupportedPreset { .. }), "{err}");
        }
    }

    #[test]
    fn preset_with_extra_keys_is_invalid() {
        let registry = PresetRegistry::builtin();
        let err = registry
            .resolve(
                StrategyKind::LowShadow,
                Some(&json!({ "preset": "standard", "analysis_period": 30 })),
            )
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidConfig(_)));
    }

    #[test]
    fn partial_params_fill_in_defaults() {
        let registry = PresetRegistry::builtin();
        let config = registry
            .resolve(StrategyKind::PriceStrength, Some(&json!({ "analysis_period": 30 })))
            .unwrap();
        assert_eq!(
            config,
            StrategyConfig::PriceStrength(PriceStrengthConfig {
                analysis_period: 30,
                ..PriceStrengthConfig::default()
            })
        );
    }

    #[test]
    fn unknown_field_is_invalid() {
        let registry = PresetRegistry::builtin();
        let err = registry
            .resolve(StrategyKind::Turtle, Some(&json!({ "entry_period": 20 })))
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidConfig(_)));
    }

    #[test]
    fn inverted_range_is_invalid() {
        let registry = PresetRegistry::builtin();
        let err = registry
            .resolve(
                StrategyKind::Fundamental,
                Some(&json!({ "min_pe": 40.0, "max_pe": 10.0 })),
            )
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_strategy_name_is_unsupported() {
        let err = PresetRegistry::builtin()
            .resolve_by_name("martingale", None)
            .unwrap_err();
        assert_eq!(err, ScreenError::UnsupportedStrategy("martingale".into()));
    }

    #[test]
    fn register_overrides_existing_entry() {
        let mut registry = PresetRegistry::builtin();
        registry.register(StrategyKind::Turtle, "system1", || {
            StrategyConfig::Turtle(TurtleConfig::aggressive())
        });
        assert_eq!(
            registry.get(StrategyKind::Turtle, "system1"),
            Some(StrategyConfig::Turtle(TurtleConfig::aggressive()))
        );
        assert_eq!(registry.preset_names(StrategyKind::Turtle).len(), 4);
    }
}
