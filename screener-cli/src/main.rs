//! Screener CLI — pick, strategies, and presets commands.
//!
//! Commands:
//! - `pick` — rank a universe of securities with one strategy
//! - `strategies` — list strategy names, descriptions and presets
//! - `presets` — print every preset of a strategy as JSON

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use screener_core::domain::StrategySignal;
use screener_core::{PresetRegistry, StrategyKind};
use screener_runner::{
    export_picks_csv, export_report_json, render_table, write_output, BarSource, CsvDirSource,
    PickOptions, PickReport, RunFile, StockPicker, SyntheticSource,
};

#[derive(Parser)]
#[command(name = "screen", about = "Screener CLI — rank stocks with strategy scorers")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every security in a data source with one strategy.
    Pick(PickCommand),
    /// List strategies with their descriptions and preset names.
    Strategies,
    /// Print each preset of a strategy as JSON.
    Presets {
        /// Strategy name.
        strategy: String,
    },
}

#[derive(Args, Debug)]
struct PickCommand {
    /// Strategy name (see `screen strategies`). Falls back to the run file.
    #[arg(long)]
    strategy: Option<String>,

    /// Named preset of the strategy.
    #[arg(long, conflicts_with = "settings")]
    preset: Option<String>,

    /// Strategy parameters as a JSON object.
    #[arg(long)]
    settings: Option<String>,

    /// TOML run file; flags given on the command line win.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of `<code>.csv` bar files.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Screen a deterministic synthetic universe of this many securities.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Start date (YYYY-MM-DD). Defaults to one year before the end.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Drop picks below this strength.
    #[arg(long)]
    min_strength: Option<u8>,

    /// Drop picks below this signal (e.g. buy, strong_buy).
    #[arg(long)]
    min_signal: Option<String>,

    /// Keep only the best N picks.
    #[arg(long)]
    top: Option<usize>,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Write to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Evaluate on one thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Debug, PartialEq)]
enum DataSource {
    CsvDir(PathBuf),
    Synthetic(usize),
}

/// A `pick` request after merging the run file under the flags.
#[derive(Debug)]
struct PickPlan {
    strategy: String,
    settings: Option<serde_json::Value>,
    start: NaiveDate,
    end: NaiveDate,
    options: PickOptions,
    top: Option<usize>,
    format: OutputFormat,
    output: Option<PathBuf>,
    source: DataSource,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Pick(cmd) => {
            let plan = cmd.into_plan(chrono::Local::now().date_naive())?;
            run_pick(plan)
        }
        Commands::Strategies => run_strategies(),
        Commands::Presets { strategy } => run_presets(&strategy),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
    })
    .transpose()
}

impl PickCommand {
    fn into_plan(self, today: NaiveDate) -> Result<PickPlan> {
        let run_file = self
            .config
            .as_deref()
            .map(|path| {
                RunFile::from_file(path)
                    .with_context(|| format!("reading run file {}", path.display()))
            })
            .transpose()?;
        let run = run_file.as_ref().map(|f| &f.run);

        let strategy = match (self.strategy, run) {
            (Some(s), _) => s,
            (None, Some(run)) => run.strategy.clone(),
            (None, None) => bail!("one of --strategy or --config is required"),
        };

        let settings = match (self.preset, self.settings) {
            (Some(p), _) => Some(serde_json::json!({ "preset": p })),
            (None, Some(raw)) => {
                Some(serde_json::from_str(&raw).context("--settings must be a JSON object")?)
            }
            (None, None) => match run_file.as_ref() {
                Some(file) => file.settings_json()?,
                None => None,
            },
        };

        let file_options = match run_file.as_ref() {
            Some(file) => file.pick_options()?,
            None => PickOptions::default(),
        };
        let min_signal = match self.min_signal {
            Some(name) => Some(name.parse::<StrategySignal>()?),
            None => file_options.min_signal,
        };

        let end = parse_date(self.end.as_deref())?
            .or_else(|| run.and_then(|r| r.end))
            .unwrap_or(today);
        let start = parse_date(self.start.as_deref())?
            .or_else(|| run.and_then(|r| r.start))
            .unwrap_or_else(|| end - chrono::Duration::days(365));

        let data_dir = self.data_dir.or_else(|| run.and_then(|r| r.data_dir.clone()));
        let source = match (data_dir, self.synthetic) {
            (_, Some(count)) => DataSource::Synthetic(count),
            (Some(dir), None) => DataSource::CsvDir(dir),
            (None, None) => {
                bail!("one of --data-dir, --synthetic or a run file data_dir is required")
            }
        };

        Ok(PickPlan {
            strategy,
            settings,
            start,
            end,
            options: PickOptions {
                min_signal,
                min_strength: self.min_strength.or(file_options.min_strength),
                parallel: !self.sequential,
            },
            top: self.top.or_else(|| run.and_then(|r| r.top)),
            format: self.format,
            output: self.output,
            source,
        })
    }
}

fn run_pick(plan: PickPlan) -> Result<()> {
    let report = match &plan.source {
        DataSource::Synthetic(count) => pick_from(SyntheticSource::new(*count), &plan)?,
        DataSource::CsvDir(dir) => {
            if !dir.is_dir() {
                bail!("data directory does not exist: {}", dir.display());
            }
            pick_from(CsvDirSource::new(dir.clone()), &plan)?
        }
    };
    info!(
        strategy = %report.strategy,
        evaluated = report.evaluated,
        picks = report.picks.len(),
        failed = report.errors.len(),
        "pick finished"
    );

    let rendered = render(&report, plan.format)?;
    match &plan.output {
        Some(path) => {
            write_output(path, &rendered)?;
            info!(path = %path.display(), picks = report.picks.len(), "report written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn pick_from<S: BarSource>(source: S, plan: &PickPlan) -> Result<PickReport> {
    let picker = StockPicker::new(source).with_options(plan.options.clone());
    let mut report =
        picker.pick_stocks(plan.start, plan.end, &plan.strategy, plan.settings.as_ref())?;
    if let Some(top) = plan.top {
        report.truncate(top);
    }
    Ok(report)
}

fn render(report: &PickReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Table => render_table(report),
        OutputFormat::Json => {
            let mut json = export_report_json(report)?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => export_picks_csv(&report.picks)?,
    })
}

fn run_strategies() -> Result<()> {
    let registry = PresetRegistry::builtin();
    for kind in StrategyKind::ALL {
        let presets = registry.preset_names(kind);
        println!("{:<26} {}", kind.as_str(), kind.description());
        if !presets.is_empty() {
            println!("{:<26} presets: {}", "", presets.join(", "));
        }
    }
    Ok(())
}

fn run_presets(strategy: &str) -> Result<()> {
    let kind: StrategyKind = strategy.parse()?;
    let registry = PresetRegistry::builtin();
    let names = registry.preset_names(kind);
    if names.is_empty() {
        println!("{kind} has no presets; default:");
        println!("{}", serde_json::to_string_pretty(&registry.resolve(kind, None)?)?);
        return Ok(());
    }
    for name in names {
        let Some(config) = registry.get(kind, name) else {
            continue;
        };
        println!("# {name}");
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn pick_command(args: &[&str]) -> PickCommand {
        let argv = ["screen", "pick"].into_iter().chain(args.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Pick(cmd) => cmd,
            _ => panic!("expected pick"),
        }
    }

    #[test]
    fn flags_build_a_plan_with_defaults() {
        let plan = pick_command(&["--strategy", "turtle", "--preset", "system2", "--synthetic", "8"])
            .into_plan(today())
            .unwrap();
        assert_eq!(plan.strategy, "turtle");
        assert_eq!(plan.settings, Some(json!({ "preset": "system2" })));
        assert_eq!(plan.end, today());
        assert_eq!(plan.start, today() - chrono::Duration::days(365));
        assert_eq!(plan.source, DataSource::Synthetic(8));
        assert_eq!(plan.format, OutputFormat::Table);
        assert!(plan.options.parallel);
    }

    #[test]
    fn flags_override_the_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "[run]\nstrategy = \"yearly_high\"\nstart = \"2024-01-01\"\nend = \"2024-03-31\"\n\
             data_dir = \"bars\"\nmin_strength = 40\ntop = 5\n\n[settings]\nrecent_days = 3\n",
        )
        .unwrap();
        let config = path.to_str().unwrap();

        let plan = pick_command(&["--config", config, "--top", "2", "--min-signal", "buy"])
            .into_plan(today())
            .unwrap();
        assert_eq!(plan.strategy, "yearly_high");
        assert_eq!(plan.settings, Some(json!({ "recent_days": 3 })));
        assert_eq!(plan.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(plan.end, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(plan.source, DataSource::CsvDir(PathBuf::from("bars")));
        assert_eq!(plan.top, Some(2));
        assert_eq!(plan.options.min_strength, Some(40));
        assert_eq!(plan.options.min_signal, Some(StrategySignal::Buy));
    }

    #[test]
    fn missing_strategy_or_source_is_an_error() {
        assert!(pick_command(&["--synthetic", "3"]).into_plan(today()).is_err());
        assert!(pick_command(&["--strategy", "turtle"]).into_plan(today()).is_err());
        assert!(pick_command(&["--strategy", "turtle", "--synthetic", "3", "--start", "2024/01/01"])
            .into_plan(today())
            .is_err());
    }

    #[test]
    fn preset_and_settings_conflict() {
        let argv = [
            "screen", "pick", "--strategy", "turtle", "--preset", "system1", "--settings", "{}",
            "--synthetic", "3",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn synthetic_pick_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports/picks.json");
        let plan = pick_command(&[
            "--strategy",
            "price_strength",
            "--synthetic",
            "5",
            "--start",
            "2024-01-01",
            "--end",
            "2024-03-31",
            "--format",
            "json",
            "--top",
            "2",
            "--output",
            out.to_str().unwrap(),
        ])
        .into_plan(today())
        .unwrap();
        run_pick(plan).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["strategy"], "price_strength");
        assert_eq!(report["evaluated"], 5);
        assert!(report["picks"].as_array().unwrap().len() <= 2);
    }

    #[test]
    fn missing_data_dir_fails_before_picking() {
        let plan = pick_command(&["--strategy", "turtle", "--data-dir", "/nonexistent/bars"])
            .into_plan(today())
            .unwrap();
        assert!(run_pick(plan).is_err());
    }
}
