//! Property tests for strategy invariants.
//!
//! Uses proptest to verify:
//! 1. Output bounds — strength in 0..=100, risk in 1..=5, for every strategy
//! 2. Purity — analyzing the same series twice gives identical results
//! 3. Indicator shape — outputs keep the input length with a NaN prefix
//! 4. Ranking order — strength descending, code ascending on ties

use proptest::prelude::*;
use screener_core::domain::{Bar, FinancialReport, SecuritySeries, Valuation};
use screener_core::indicators::{atr, ema, rsi, sma};
use screener_core::{build_strategy, rank_results, StrategyConfig, StrategyKind};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Daily (change, wick, volume) triples within the ±20% a board allows.
fn arb_moves(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-0.2..0.2_f64, 0.0..0.05_f64, 100.0..10_000.0_f64), len)
}

fn bars_from(moves: &[(f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut prev = 10.0;
    moves
        .iter()
        .enumerate()
        .map(|(i, &(change, wick, volume))| {
            let open = prev;
            let close = (prev * (1.0 + change)).max(0.01);
            prev = close;
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) * (1.0 + wick),
                low: open.min(close) * (1.0 - wick),
                close,
                volume,
                amount: volume * close,
            }
        })
        .collect()
}

fn series_from(code: &str, moves: &[(f64, f64, f64)]) -> SecuritySeries {
    let bars = bars_from(moves);
    let valuations = bars
        .iter()
        .enumerate()
        .map(|(i, b)| Valuation {
            date: b.date,
            pe: Some(5.0 + (i % 40) as f64),
            pb: Some(0.5 + (i % 7) as f64 * 0.3),
            market_cap: Some(50.0 + (i % 11) as f64 * 20.0),
        })
        .collect();
    let financials = bars
        .iter()
        .step_by(60)
        .enumerate()
        .map(|(q, b)| FinancialReport {
            period: format!("Q{q}"),
            report_date: b.date,
            revenue_growth: -10.0 + q as f64 * 12.0,
            profit_growth: -20.0 + q as f64 * 15.0,
            gross_margin: 25.0,
            net_margin: 8.0,
            roe: 4.0 + q as f64 * 3.0,
            debt_ratio: 55.0,
            operating_cash_flow: 3.0,
            net_profit: 2.0,
        })
        .collect();
    SecuritySeries::new(code, bars)
        .with_financials(financials)
        .with_valuations(valuations)
}

// ── 1 & 2. Bounds and purity ─────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every strategy either errors or yields a result inside the bounds,
    /// and a repeat call yields the same result.
    #[test]
    fn strategy_results_stay_in_bounds(moves in arb_moves(1..320)) {
        let series = series_from("000001.SZ", &moves);
        for kind in StrategyKind::ALL {
            let strategy = build_strategy(&StrategyConfig::default_for(kind)).unwrap();
            let first = strategy.analyze(&series);
            let second = strategy.analyze(&series);
            match (&first, &second) {
                // NaN fields compare unequal, so compare the serialized form
                (Ok(a), Ok(b)) => prop_assert_eq!(
                    serde_json::to_value(a).unwrap(),
                    serde_json::to_value(b).unwrap(),
                    "{} is not pure", kind
                ),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                _ => prop_assert!(false, "{} changed outcome between calls", kind),
            }
            if let Ok(result) = first {
                prop_assert!(result.signal_strength() <= 100, "{}", kind);
                prop_assert!((1..=5).contains(&result.risk_level()), "{}", kind);
                prop_assert_eq!(result.kind(), kind);
                prop_assert_eq!(result.stock_code(), "000001.SZ");
            }
        }
    }

    /// Too-short series are rejected rather than scored.
    #[test]
    fn short_series_are_insufficient(moves in arb_moves(1..5)) {
        let series = series_from("000002.SZ", &moves);
        let strategy = build_strategy(&StrategyConfig::default_for(StrategyKind::Turtle)).unwrap();
        let is_insufficient = matches!(
            strategy.analyze(&series),
            Err(screener_core::ScreenError::InsufficientData { .. })
        );
        prop_assert!(is_insufficient);
    }
}

// ── 3. Indicator shape ───────────────────────────────────────────────

proptest! {
    #[test]
    fn indicators_keep_length_and_nan_prefix(
        moves in arb_moves(30..120),
        period in 2..20_usize,
    ) {
        let bars = bars_from(&moves);
        let sma = sma(&bars, period).unwrap();
        let ema = ema(&bars, period).unwrap();
        let rsi = rsi(&bars, period).unwrap();
        let atr = atr(&bars, period).unwrap();
        for out in [&sma, &ema, &rsi, &atr] {
            prop_assert_eq!(out.len(), bars.len());
        }
        prop_assert!(sma[..period - 1].iter().all(|v| v.is_nan()));
        prop_assert!(sma[period - 1..].iter().all(|v| v.is_finite()));
        prop_assert!(ema[..period - 1].iter().all(|v| v.is_nan()));
        prop_assert!(rsi[..period].iter().all(|v| v.is_nan()));
        prop_assert!(rsi[period..].iter().all(|v| (0.0..=100.0).contains(v)));
        prop_assert!(atr[period..].iter().all(|v| *v >= 0.0));
    }
}

// ── 4. Ranking ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ranking_is_strength_desc_then_code_asc(
        universe in prop::collection::vec(arb_moves(25..40), 2..12),
    ) {
        let strategy = build_strategy(&StrategyConfig::default_for(StrategyKind::Turtle)).unwrap();
        let mut results: Vec<_> = universe
            .iter()
            .enumerate()
            .filter_map(|(i, moves)| strategy.analyze(&series_from(&format!("{i:06}.SZ"), moves)).ok())
            .collect();
        rank_results(&mut results);
        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.signal_strength() > b.signal_strength()
                    || (a.signal_strength() == b.signal_strength() && a.stock_code() <= b.stock_code())
            );
        }
    }
}
