//! Property tests for simulator invariants.
//!
//! Uses proptest to verify, for arbitrary signals and prices:
//! 1. Accounting identity — total == holdings + cash on every row
//! 2. No drift — running sum of position deltas equals the signal position
//! 3. Flags — entry/exit is the signal difference, undefined only on row 0
//! 4. Determinism — the same input gives bit-identical output

use chrono::NaiveDate;
use proptest::prelude::*;
use signalbt_core::domain::{SignalBar, SignalSeries};
use signalbt_core::engine::{simulate, SimulationConfig};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_rows() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((0u8..=1, arb_price()), 1..120)
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (1_000.0..1_000_000.0_f64, 1u64..5_000).prop_map(|(capital, shares)| SimulationConfig {
        initial_capital: capital,
        share_count: shares,
    })
}

fn build(rows: &[(u8, f64)]) -> SignalSeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, &(s, c))| SignalBar::new(start + chrono::Duration::days(i as i64), c, s))
        .collect();
    SignalSeries::new(bars).unwrap()
}

proptest! {
    #[test]
    fn total_equals_holdings_plus_cash(rows in arb_rows(), config in arb_config()) {
        let state = simulate(&build(&rows), &config).unwrap();
        for r in state.records() {
            let tolerance = 1e-9 * r.total.abs().max(1.0);
            prop_assert!((r.total - (r.holdings + r.cash)).abs() <= tolerance);
        }
    }

    #[test]
    fn position_never_drifts(rows in arb_rows(), config in arb_config()) {
        let state = simulate(&build(&rows), &config).unwrap();
        let mut running = 0_i64;
        for (r, &(signal, _)) in state.records().iter().zip(&rows) {
            running += r.entry_exit_position;
            prop_assert_eq!(running, r.position);
            prop_assert_eq!(r.position, config.share_count as i64 * i64::from(signal));
        }
    }

    #[test]
    fn flags_are_signal_differences(rows in arb_rows(), config in arb_config()) {
        let state = simulate(&build(&rows), &config).unwrap();
        let records = state.records();
        prop_assert_eq!(records[0].entry_exit, None);
        prop_assert_eq!(records[0].daily_return, None);
        prop_assert_eq!(records[0].cumulative_return, 0.0);
        for i in 1..records.len() {
            let expected = rows[i].0 as i8 - rows[i - 1].0 as i8;
            prop_assert_eq!(records[i].entry_exit, Some(expected));
        }
    }

    #[test]
    fn simulation_is_deterministic(rows in arb_rows(), config in arb_config()) {
        let series = build(&rows);
        let a = simulate(&series, &config).unwrap();
        let b = simulate(&series, &config).unwrap();
        for (x, y) in a.records().iter().zip(b.records()) {
            prop_assert_eq!(x.total.to_bits(), y.total.to_bits());
            prop_assert_eq!(x.cash.to_bits(), y.cash.to_bits());
        }
    }
}
