//! Run config file — a TOML description of one pick request.
//!
//! ```toml
//! [run]
//! strategy = "turtle"
//! start = "2024-01-01"
//! end = "2024-06-30"
//! data_dir = "data/daily"
//! min_strength = 60
//! min_signal = "buy"
//! top = 20
//!
//! [settings]
//! preset = "system2"
//! ```
//!
//! The `[settings]` table is forwarded to the preset resolver unchanged, so
//! it may hold a `preset` key or a partial parameter object.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use screener_core::domain::StrategySignal;

use crate::error::ConfigFileError;
use crate::picker::PickOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub strategy: String,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub min_strength: Option<u8>,
    /// Signal name such as `buy` or `strong_buy`.
    #[serde(default)]
    pub min_signal: Option<String>,
    #[serde(default)]
    pub top: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub run: RunSection,
    #[serde(default)]
    pub settings: Option<toml::Table>,
}

impl RunFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    /// The `[settings]` table as the JSON object the resolver expects.
    pub fn settings_json(&self) -> Result<Option<serde_json::Value>, ConfigFileError> {
        self.settings
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(ConfigFileError::from)
    }

    pub fn min_signal(&self) -> Result<Option<StrategySignal>, ConfigFileError> {
        self.run
            .min_signal
            .as_deref()
            .map(str::parse::<StrategySignal>)
            .transpose()
            .map_err(|e| ConfigFileError::Invalid(e.to_string()))
    }

    /// Cutoffs from `[run]`, with parallel execution on.
    pub fn pick_options(&self) -> Result<PickOptions, ConfigFileError> {
        Ok(PickOptions {
            min_signal: self.min_signal()?,
            min_strength: self.run.min_strength,
            parallel: true,
        })
    }
}
