//! Batch ranking — one strategy over a universe, in parallel.
//!
//! Each series is analyzed independently. A failure is recorded against its
//! code and logged; it never aborts the rest of the batch. Results are
//! ranked by strength descending, then code ascending, so the output is the
//! same whether or not rayon runs the batch in parallel.

use rayon::prelude::*;
use tracing::{info, warn};

use screener_core::domain::{SecuritySeries, StrategySignal};
use screener_core::{BatchOutcome, ScreenError, SecurityError, Strategy, StrategyResult};

pub struct BatchRanker {
    strategy: Box<dyn Strategy>,
    parallel: bool,
    min_strength: Option<u8>,
    min_signal: Option<StrategySignal>,
}

impl BatchRanker {
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        Self {
            strategy,
            parallel: true,
            min_strength: None,
            min_signal: None,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Drop results weaker than `min`.
    pub fn with_min_strength(mut self, min: Option<u8>) -> Self {
        self.min_strength = min;
        self
    }

    /// Drop results whose signal is more bearish than `min`.
    pub fn with_min_signal(mut self, min: Option<StrategySignal>) -> Self {
        self.min_signal = min;
        self
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    fn passes(&self, result: &StrategyResult) -> bool {
        self.min_strength
            .map_or(true, |min| result.signal_strength() >= min)
            && self
                .min_signal
                .map_or(true, |min| result.strategy_signal() >= min)
    }

    pub fn rank(&self, universe: &[SecuritySeries]) -> BatchOutcome {
        let kind = self.strategy.kind();
        info!(strategy = %kind, securities = universe.len(), parallel = self.parallel, "ranking batch");

        let evaluate = |series: &SecuritySeries| -> Result<StrategyResult, SecurityError> {
            self.strategy.analyze(series).map_err(|error: ScreenError| {
                warn!(code = %series.code, strategy = %kind, %error, "analysis failed");
                SecurityError {
                    code: series.code.clone(),
                    error,
                }
            })
        };
        let evaluated: Vec<Result<StrategyResult, SecurityError>> = if self.parallel {
            universe.par_iter().map(evaluate).collect()
        } else {
            universe.iter().map(evaluate).collect()
        };

        let mut outcome = BatchOutcome {
            evaluated: universe.len(),
            ..BatchOutcome::default()
        };
        let mut filtered = 0usize;
        for item in evaluated {
            match item {
                Ok(result) if self.passes(&result) => outcome.results.push(result),
                Ok(_) => filtered += 1,
                Err(error) => outcome.errors.push(error),
            }
        }
        outcome.sort();

        info!(
            strategy = %kind,
            ranked = outcome.results.len(),
            filtered,
            failed = outcome.errors.len(),
            "batch ranked"
        );
        outcome
    }
}
