//! Stock picking — the library entry point.
//!
//! `pick_stocks` resolves a strategy and its settings, loads every code the
//! source lists, ranks the universe, and returns a report. Request-level
//! problems (unknown strategy, bad settings, inverted dates) are errors;
//! per-security problems are collected in the report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use screener_core::domain::{SecuritySeries, StrategySignal};
use screener_core::{build_strategy, PresetRegistry, ScreenError, StrategyKind, StrategyResult};

use crate::error::PickError;
use crate::ranker::BatchRanker;
use crate::source::BarSource;

/// Cutoffs and execution mode for a pick request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickOptions {
    pub min_signal: Option<StrategySignal>,
    pub min_strength: Option<u8>,
    pub parallel: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            min_signal: None,
            min_strength: None,
            parallel: true,
        }
    }
}

/// One ranked pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPickResult {
    pub code: String,
    pub name: Option<String>,
    pub result: StrategyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Load,
    Analyze,
}

/// A security that produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickFailure {
    pub code: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickReport {
    pub strategy: StrategyKind,
    pub config_fingerprint: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Ranked: strength descending, code ascending.
    pub picks: Vec<StockPickResult>,
    /// Ordered by code.
    pub errors: Vec<PickFailure>,
    pub evaluated: usize,
}

impl PickReport {
    pub fn truncate(&mut self, top: usize) {
        self.picks.truncate(top);
    }
}

pub struct StockPicker<S: BarSource> {
    source: S,
    registry: PresetRegistry,
    options: PickOptions,
}

impl<S: BarSource> StockPicker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            registry: PresetRegistry::builtin(),
            options: PickOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PickOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: PresetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    /// Screen every code in the source over `[start, end]`.
    pub fn pick_stocks(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        strategy_name: &str,
        settings: Option<&Value>,
    ) -> Result<PickReport, PickError> {
        if start > end {
            return Err(PickError::InvalidRange { start, end });
        }
        let config = self.registry.resolve_by_name(strategy_name, settings)?;
        let strategy = build_strategy(&config)?;
        let required = strategy.required_bars();
        let kind = config.kind();
        let config_fingerprint = config.fingerprint();

        let codes = self.source.list_codes()?;
        info!(
            strategy = %kind,
            %start,
            %end,
            codes = codes.len(),
            fingerprint = %config_fingerprint,
            "picking stocks"
        );

        let mut errors = Vec::new();
        let mut universe: Vec<SecuritySeries> = Vec::with_capacity(codes.len());
        for code in &codes {
            match self.source.load(code, start, end) {
                Ok(series) if series.len() < required => {
                    let error = ScreenError::InsufficientData {
                        required,
                        actual: series.len(),
                    };
                    warn!(%code, %error, "skipping short series");
                    errors.push(PickFailure {
                        code: code.clone(),
                        stage: FailureStage::Analyze,
                        message: error.to_string(),
                    });
                }
                Ok(series) => universe.push(series),
                Err(error) => {
                    warn!(%code, %error, "load failed");
                    errors.push(PickFailure {
                        code: code.clone(),
                        stage: FailureStage::Load,
                        message: error.to_string(),
                    });
                }
            }
        }

        let outcome = BatchRanker::new(strategy)
            .with_parallelism(self.options.parallel)
            .with_min_strength(self.options.min_strength)
            .with_min_signal(self.options.min_signal)
            .rank(&universe);

        errors.extend(outcome.errors.into_iter().map(|e| PickFailure {
            code: e.code,
            stage: FailureStage::Analyze,
            message: e.error.to_string(),
        }));
        errors.sort_by(|a, b| a.code.cmp(&b.code));

        let picks: Vec<StockPickResult> = outcome
            .results
            .into_iter()
            .map(|result| {
                let code = result.stock_code().to_string();
                let name = universe
                    .iter()
                    .find(|s| s.code == code)
                    .and_then(|s| s.name.clone());
                StockPickResult { code, name, result }
            })
            .collect();

        info!(
            strategy = %kind,
            evaluated = codes.len(),
            picks = picks.len(),
            failed = errors.len(),
            "pick complete"
        );

        Ok(PickReport {
            strategy: kind,
            config_fingerprint,
            start,
            end,
            picks,
            errors,
            evaluated: codes.len(),
        })
    }
}
