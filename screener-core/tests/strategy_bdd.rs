//! BDD scenarios for strategy evaluation end to end: settings resolution,
//! strategy construction, and batch analysis.

use chrono::NaiveDate;
use screener_core::domain::{Bar, SecuritySeries, StrategySignal};
use screener_core::strategies::single_limit_up::limit_up_threshold;
use screener_core::{
    build_strategy, PresetRegistry, ScreenError, StrategyKind, StrategyResult,
};
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────

fn bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    Bar {
        date: base + chrono::Duration::days(day),
        open,
        high,
        low,
        close,
        volume: 10_000.0,
        amount: 10_000.0 * close,
    }
}

/// `n` quiet bars around 10 with a 10.5 ceiling.
fn flat(n: usize) -> Vec<Bar> {
    (0..n as i64).map(|d| bar(d, 10.0, 10.5, 9.5, 10.0)).collect()
}

fn breakout_series(code: &str) -> SecuritySeries {
    let mut bars = flat(30);
    bars.push(bar(30, 10.0, 11.2, 9.9, 11.0));
    SecuritySeries::new(code, bars)
}

#[test]
fn bdd_scenario_turtle_preset_ranks_breakout_first() {
    // GIVEN the turtle system1 preset resolved from request settings
    let registry = PresetRegistry::builtin();
    let config = registry
        .resolve_by_name("turtle", Some(&json!({ "preset": "system1" })))
        .expect("preset should resolve");
    let strategy = build_strategy(&config).expect("strategy should build");

    // AND a universe with one breakout, one quiet stock and one short history
    let universe = vec![
        SecuritySeries::new("000002.SZ", flat(31)),
        breakout_series("000001.SZ"),
        SecuritySeries::new("000003.SZ", flat(5)),
    ];

    // WHEN the universe is analyzed in one batch
    let outcome = strategy.batch_analyze(&universe);

    // THEN every series is accounted for
    assert_eq!(outcome.evaluated, 3);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.errors.len(), 1);

    // AND the breakout ranks first
    let top = match &outcome.results[0] {
        StrategyResult::Turtle(r) => r,
        other => panic!("unexpected {:?}", other.kind()),
    };
    assert_eq!(top.header.stock_code, "000001.SZ");
    assert!(top.is_entry_breakout);
    assert!(outcome.results[0].signal_strength() > outcome.results[1].signal_strength());

    // AND the short history is reported, not scored
    assert_eq!(outcome.errors[0].code, "000003.SZ");
    assert_eq!(
        outcome.errors[0].error,
        ScreenError::InsufficientData {
            required: 21,
            actual: 5
        }
    );
}

#[test]
fn bdd_scenario_fundamental_without_reports_is_an_error_entry() {
    // GIVEN the fundamental strategy at its defaults
    let config = PresetRegistry::builtin()
        .resolve(StrategyKind::Fundamental, None)
        .unwrap();
    let strategy = build_strategy(&config).unwrap();

    // WHEN a series with bars but no financial reports is analyzed
    let outcome = strategy.batch_analyze(&[SecuritySeries::new("600519.SH", flat(10))]);

    // THEN it lands in the error list as missing fundamentals
    assert!(outcome.results.is_empty());
    assert_eq!(
        outcome.errors[0].error,
        ScreenError::MissingFundamentals("600519.SH".into())
    );
}

#[test]
fn bdd_scenario_limit_up_threshold_follows_the_board() {
    // GIVEN a ChiNext code and a main-board code, each with a 10% day and a 20% day
    let series_with = |code: &str, close: f64| {
        let mut bars = flat(20);
        bars.push(bar(20, 10.0, close, 10.0, close));
        SecuritySeries::new(code, bars)
    };
    let config = PresetRegistry::builtin()
        .resolve(StrategyKind::SingleLimitUp, None)
        .unwrap();
    let strategy = build_strategy(&config).unwrap();
    let count = |series: SecuritySeries| match strategy.analyze(&series).unwrap() {
        StrategyResult::SingleLimitUp(r) => r.limit_up_count,
        other => panic!("unexpected {:?}", other.kind()),
    };

    // WHEN both are screened for a single limit-up
    let main_ten = count(series_with("600000.SH", 11.0));
    let main_twenty = count(series_with("600000.SH", 12.0));
    let chinext_ten = count(series_with("300750.SZ", 11.0));
    let chinext_twenty = count(series_with("300750.SZ", 12.0));

    // THEN each board counts only the move at its own limit
    assert_eq!(limit_up_threshold("300750.SZ"), 20.0);
    assert_eq!(limit_up_threshold("600000.SH"), 10.0);
    assert_eq!((main_ten, main_twenty), (1, 0));
    assert_eq!((chinext_ten, chinext_twenty), (0, 1));
}

#[test]
fn bdd_scenario_settings_identity_is_fingerprinted() {
    // GIVEN two requests with the same effective settings
    let registry = PresetRegistry::builtin();
    let by_default = registry.resolve(StrategyKind::ConsecutiveStrong, None).unwrap();
    let by_preset = registry
        .resolve(StrategyKind::ConsecutiveStrong, Some(&json!({ "preset": "five_days" })))
        .unwrap();

    // AND a third that differs
    let relaxed = registry
        .resolve(StrategyKind::ConsecutiveStrong, Some(&json!({ "preset": "relaxed" })))
        .unwrap();

    // THEN equal settings share a fingerprint and different ones do not
    assert_eq!(by_default.fingerprint(), by_preset.fingerprint());
    assert_ne!(by_default.fingerprint(), relaxed.fingerprint());
}

#[test]
fn bdd_scenario_strong_run_signals_buy() {
    // GIVEN five straight up days closing off their lows
    let mut bars = flat(3);
    for d in 3..8 {
        let open = 10.0 + (d - 3) as f64 * 0.4;
        bars.push(bar(d, open, open + 0.5, open - 0.1, open + 0.4));
    }
    let series = SecuritySeries::new("002594.SZ", bars);

    // WHEN the consecutive-strong strategy evaluates it
    let config = PresetRegistry::builtin()
        .resolve(StrategyKind::ConsecutiveStrong, None)
        .unwrap();
    let result = build_strategy(&config).unwrap().analyze(&series).unwrap();

    // THEN the run qualifies with a buy-side signal
    assert!(matches!(
        result.strategy_signal(),
        StrategySignal::Buy | StrategySignal::StrongBuy
    ));
    assert!(result.signal_strength() >= 65);
}
