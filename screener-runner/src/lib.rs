//! Screener Runner — batch ranking, stock picking, bar sources, run files.
//!
//! This crate builds on `screener-core` to provide:
//! - Parallel batch ranking with strength and signal cutoffs
//! - Bar sources: in-memory, CSV directory, deterministic synthetic
//! - The `pick_stocks` entry point and its report
//! - TOML run files and CSV/JSON/table export

pub mod config;
pub mod error;
pub mod export;
pub mod picker;
pub mod ranker;
pub mod source;

pub use config::{RunFile, RunSection};
pub use error::{ConfigFileError, ExportError, PickError, SourceError};
pub use export::{export_picks_csv, export_report_json, render_table, write_output};
pub use picker::{FailureStage, PickFailure, PickOptions, PickReport, StockPickResult, StockPicker};
pub use ranker::BatchRanker;
pub use source::{BarSource, CsvDirSource, InMemorySource, SyntheticSource};
