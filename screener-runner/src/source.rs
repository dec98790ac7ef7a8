//! Bar sources for the picker.
//!
//! A source lists the codes it knows and loads one security's history for a
//! date window. Three implementations:
//! 1. `InMemorySource` — series handed in by the caller
//! 2. `CsvDirSource` — a directory of per-code CSV files
//! 3. `SyntheticSource` — deterministic random walks for development
//!
//! Every source returns bars inside `[start, end]` inclusive. Financial
//! reports and valuations are cut at `end` but keep their earlier history,
//! since valuation percentiles look back past the bar window.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use tracing::debug;

use screener_core::domain::{Bar, FinancialReport, SecuritySeries, Valuation};

use crate::error::SourceError;

pub trait BarSource: Send + Sync {
    /// Every code this source can load, ascending.
    fn list_codes(&self) -> Result<Vec<String>, SourceError>;

    fn load(&self, code: &str, start: NaiveDate, end: NaiveDate)
        -> Result<SecuritySeries, SourceError>;
}

/// Restrict a full history to the request window.
fn windowed(series: &SecuritySeries, start: NaiveDate, end: NaiveDate) -> SecuritySeries {
    SecuritySeries {
        code: series.code.clone(),
        name: series.name.clone(),
        bars: series.slice_dates(start, end).to_vec(),
        financials: series
            .financials
            .iter()
            .filter(|f| f.report_date <= end)
            .cloned()
            .collect(),
        valuations: series
            .valuations
            .iter()
            .filter(|v| v.date <= end)
            .cloned()
            .collect(),
    }
}

// ─── In-memory ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    series: BTreeMap<String, SecuritySeries>,
}

impl InMemorySource {
    pub fn new(series: impl IntoIterator<Item = SecuritySeries>) -> Self {
        Self {
            series: series.into_iter().map(|s| (s.code.clone(), s)).collect(),
        }
    }

    pub fn insert(&mut self, series: SecuritySeries) {
        self.series.insert(series.code.clone(), series);
    }
}

impl BarSource for InMemorySource {
    fn list_codes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.series.keys().cloned().collect())
    }

    fn load(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SecuritySeries, SourceError> {
        self.series
            .get(code)
            .map(|s| windowed(s, start, end))
            .ok_or_else(|| SourceError::NotFound(code.to_string()))
    }
}

// ─── CSV directory ──────────────────────────────────────────────────

const FINANCIALS_SUFFIX: &str = ".financials.csv";
const VALUATIONS_SUFFIX: &str = ".valuations.csv";

/// A directory holding `<code>.csv` bar files with header
/// `date,open,high,low,close,volume,amount`, plus optional
/// `<code>.financials.csv` and `<code>.valuations.csv` companions.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }

    fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
        if path.exists() {
            Self::read_rows(path)
        } else {
            Ok(Vec::new())
        }
    }
}

impl BarSource for CsvDirSource {
    fn list_codes(&self) -> Result<Vec<String>, SourceError> {
        let mut codes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(FINANCIALS_SUFFIX) || name.ends_with(VALUATIONS_SUFFIX) {
                continue;
            }
            if let Some(code) = name.strip_suffix(".csv") {
                codes.push(code.to_string());
            }
        }
        codes.sort();
        Ok(codes)
    }

    fn load(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SecuritySeries, SourceError> {
        let bar_path = self.dir.join(format!("{code}.csv"));
        if !bar_path.exists() {
            return Err(SourceError::NotFound(code.to_string()));
        }
        let mut bars: Vec<Bar> = Self::read_rows(&bar_path)?;
        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|p| p[0].date == p[1].date) {
            return Err(SourceError::Parse {
                path: bar_path,
                reason: format!("duplicate date {}", pair[0].date),
            });
        }

        let mut financials: Vec<FinancialReport> =
            Self::read_optional(&self.dir.join(format!("{code}{FINANCIALS_SUFFIX}")))?;
        financials.sort_by_key(|f| f.report_date);
        let mut valuations: Vec<Valuation> =
            Self::read_optional(&self.dir.join(format!("{code}{VALUATIONS_SUFFIX}")))?;
        valuations.sort_by_key(|v| v.date);

        debug!(
            code,
            bars = bars.len(),
            financials = financials.len(),
            valuations = valuations.len(),
            "loaded csv series"
        );

        let full = SecuritySeries::new(code, bars)
            .with_financials(financials)
            .with_valuations(valuations);
        Ok(windowed(&full, start, end))
    }
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Board prefixes cycled through so synthetic codes hit every limit-up rule.
const SYNTHETIC_BOARDS: [(&str, &str); 5] = [
    ("600", "SH"),
    ("000", "SZ"),
    ("300", "SZ"),
    ("688", "SH"),
    ("920", "BJ"),
];

/// Deterministic random-walk series, seeded per code from BLAKE3.
///
/// Developer-only: the same code and window always produce the same bars,
/// which makes CLI output reproducible without market data.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    codes: Vec<String>,
}

impl SyntheticSource {
    /// `count` codes spread across the boards.
    pub fn new(count: usize) -> Self {
        let codes = (0..count)
            .map(|i| {
                let (prefix, market) = SYNTHETIC_BOARDS[i % SYNTHETIC_BOARDS.len()];
                format!("{prefix}{:03}.{market}", i + 1)
            })
            .collect();
        Self { codes }
    }

    pub fn with_codes(codes: impl IntoIterator<Item = String>) -> Self {
        let mut codes: Vec<String> = codes.into_iter().collect();
        codes.sort();
        Self { codes }
    }

    fn generate(code: &str, start: NaiveDate, end: NaiveDate) -> SecuritySeries {
        let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut price: f64 = rng.gen_range(5.0..50.0);
        let shares = rng.gen_range(2.0e8..5.0e9);
        let mut bars = Vec::new();
        let mut valuations = Vec::new();
        let mut financials = Vec::new();
        let mut current = start;
        let mut quarter = 0;

        while current <= end {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.04..0.045);
            let open = price * (1.0 + rng.gen_range(-0.01..0.01));
            let close = (price * (1.0 + daily_return)).max(0.5);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.02));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.02));
            let volume = rng.gen_range(1.0e5..5.0e6_f64).round();

            bars.push(Bar {
                date: current,
                open,
                high,
                low,
                close,
                volume,
                amount: volume * close,
            });
            let eps = rng.gen_range(0.2..2.0);
            valuations.push(Valuation {
                date: current,
                pe: Some(close / eps),
                pb: Some(rng.gen_range(0.6..8.0)),
                market_cap: Some(close * shares / 1.0e8),
            });

            // one report per quarter, on the first trading day of the quarter
            let q = current.year() * 4 + current.month0() as i32 / 3;
            if q != quarter {
                quarter = q;
                financials.push(FinancialReport {
                    period: format!("{}Q{}", current.year(), current.month0() / 3 + 1),
                    report_date: current,
                    revenue_growth: rng.gen_range(-20.0..60.0),
                    profit_growth: rng.gen_range(-40.0..80.0),
                    gross_margin: rng.gen_range(10.0..60.0),
                    net_margin: rng.gen_range(-5.0..25.0),
                    roe: rng.gen_range(-5.0..25.0),
                    debt_ratio: rng.gen_range(15.0..85.0),
                    operating_cash_flow: rng.gen_range(-2.0..10.0),
                    net_profit: rng.gen_range(-1.0..6.0),
                });
            }

            price = close;
            current += chrono::Duration::days(1);
        }

        SecuritySeries::new(code, bars)
            .with_name(format!("Synthetic {code}"))
            .with_financials(financials)
            .with_valuations(valuations)
    }
}

impl BarSource for SyntheticSource {
    fn list_codes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.codes.clone())
    }

    fn load(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SecuritySeries, SourceError> {
        if !self.codes.iter().any(|c| c == code) {
            return Err(SourceError::NotFound(code.to_string()));
        }
        Ok(Self::generate(code, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn synthetic_is_deterministic_per_code() {
        let source = SyntheticSource::new(3);
        let a = source.load("600001.SH", d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let b = source.load("600001.SH", d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        let other = source.load("000002.SZ", d(2024, 1, 1), d(2024, 3, 31)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.bars, other.bars);
        assert!(a.validate().is_ok());
        assert!(a.bars.iter().all(|b| b.is_sane()));
    }

    #[test]
    fn synthetic_skips_weekends_and_reports_quarterly() {
        let series = SyntheticSource::new(1)
            .load("600001.SH", d(2024, 1, 1), d(2024, 6, 30))
            .unwrap();
        assert!(series
            .bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert_eq!(series.financials.len(), 2);
        assert_eq!(series.valuations.len(), series.bars.len());
    }

    #[test]
    fn synthetic_codes_cover_the_boards() {
        let codes = SyntheticSource::new(5).list_codes().unwrap();
        assert_eq!(
            codes,
            vec!["600001.SH", "000002.SZ", "300003.SZ", "688004.SH", "920005.BJ"]
        );
    }

    #[test]
    fn unknown_code_is_not_found() {
        let source = InMemorySource::default();
        assert!(matches!(
            source.load("X", d(2024, 1, 1), d(2024, 1, 2)),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn in_memory_windows_bars_inclusively() {
        let bars: Vec<Bar> = (1..=10)
            .map(|day| Bar {
                date: d(2024, 1, day),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 1.0,
                amount: 10.0,
            })
            .collect();
        let source = InMemorySource::new([SecuritySeries::new("A", bars)]);
        let series = source.load("A", d(2024, 1, 3), d(2024, 1, 5)).unwrap();
        assert_eq!(series.bars.len(), 3);
        assert_eq!(series.bars[0].date, d(2024, 1, 3));
        assert_eq!(series.bars[2].date, d(2024, 1, 5));
    }
}
