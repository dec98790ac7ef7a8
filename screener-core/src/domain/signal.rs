//! Signal vocabulary shared by all strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScreenError;

/// Five-level trading signal, ordered from most bearish to most bullish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySignal {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl StrategySignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongSell => "strong_sell",
            Self::Sell => "sell",
            Self::Hold => "hold",
            Self::Buy => "buy",
            Self::StrongBuy => "strong_buy",
        }
    }

    pub fn is_bullish(self) -> bool {
        self >= Self::Buy
    }
}

impl fmt::Display for StrategySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategySignal {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "strong_sell" => Ok(Self::StrongSell),
            "sell" => Ok(Self::Sell),
            "hold" => Ok(Self::Hold),
            "buy" => Ok(Self::Buy),
            "strong_buy" => Ok(Self::StrongBuy),
            other => Err(ScreenError::InvalidConfig(format!(
                "unknown signal level '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_runs_bearish_to_bullish() {
        assert!(StrategySignal::StrongSell < StrategySignal::Sell);
        assert!(StrategySignal::Hold < StrategySignal::Buy);
        assert!(StrategySignal::Buy < StrategySignal::StrongBuy);
        assert!(StrategySignal::Buy.is_bullish());
        assert!(!StrategySignal::Hold.is_bullish());
    }

    #[test]
    fn parses_kebab_and_snake_case() {
        assert_eq!("strong-buy".parse::<StrategySignal>(), Ok(StrategySignal::StrongBuy));
        assert_eq!("Sell".parse::<StrategySignal>(), Ok(StrategySignal::Sell));
        assert!("moon".parse::<StrategySignal>().is_err());
    }
}
