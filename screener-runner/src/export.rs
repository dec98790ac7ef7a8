//! Export — JSON, CSV, and a plain-text table for pick reports.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::ExportError;
use crate::picker::{PickReport, StockPickResult};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a full report to pretty JSON.
pub fn export_report_json(report: &PickReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export picks as CSV, one row per security.
///
/// Columns: code, name, signal, strength, risk, price, date, description
pub fn export_picks_csv(picks: &[StockPickResult]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "code",
        "name",
        "signal",
        "strength",
        "risk",
        "price",
        "date",
        "description",
    ])?;

    for pick in picks {
        let h = pick.result.header();
        wtr.write_record([
            pick.code.as_str(),
            pick.name.as_deref().unwrap_or(""),
            h.strategy_signal.as_str(),
            &h.signal_strength.to_string(),
            &h.risk_level.to_string(),
            &format!("{:.2}", h.current_price),
            &h.analysis_date.to_string(),
            &h.analysis_description,
        ])?;
    }

    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

/// Write `content` to `path`, creating parent directories.
pub fn write_output(path: &Path, content: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

// ─── Text table ─────────────────────────────────────────────────────

/// Human-readable summary of a report.
pub fn render_table(report: &PickReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} | {} .. {} | {} evaluated, {} picked, {} failed",
        report.strategy,
        report.start,
        report.end,
        report.evaluated,
        report.picks.len(),
        report.errors.len()
    );
    let _ = writeln!(
        out,
        "{:<4} {:<12} {:<11} {:>8} {:>4} {:>10}  {}",
        "#", "code", "signal", "strength", "risk", "price", "description"
    );
    for (i, pick) in report.picks.iter().enumerate() {
        let h = pick.result.header();
        let _ = writeln!(
            out,
            "{:<4} {:<12} {:<11} {:>8} {:>4} {:>10.2}  {}",
            i + 1,
            pick.code,
            h.strategy_signal.as_str(),
            h.signal_strength,
            h.risk_level,
            h.current_price,
            h.analysis_description
        );
    }
    for failure in &report.errors {
        let _ = writeln!(out, "  ! {} ({:?}): {}", failure.code, failure.stage, failure.message);
    }
    out
}
