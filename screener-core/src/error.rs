//! Error taxonomy shared by every layer of the engine.

use thiserror::Error;

/// Errors surfaced by indicators, strategies and the config resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenError {
    #[error("insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("strategy '{strategy}' has no preset named '{preset}'")]
    UnsupportedPreset { strategy: String, preset: String },

    #[error("unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("invalid series for '{code}': {reason}")]
    InvalidSeries { code: String, reason: String },

    #[error("no fundamentals available for '{0}'")]
    MissingFundamentals(String),
}

impl ScreenError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Fail with `InsufficientData` when `actual < required`.
    pub fn require(required: usize, actual: usize) -> Result<(), Self> {
        if actual < required {
            Err(Self::InsufficientData { required, actual })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_passes_at_boundary() {
        assert!(ScreenError::require(20, 20).is_ok());
        assert_eq!(
            ScreenError::require(20, 10),
            Err(ScreenError::InsufficientData {
                required: 20,
                actual: 10
            })
        );
    }

    #[test]
    fn messages_name_the_preset() {
        let err = ScreenError::UnsupportedPreset {
            strategy: "turtle".into(),
            preset: "moon".into(),
        };
        assert_eq!(err.to_string(), "strategy 'turtle' has no preset named 'moon'");
    }
}
