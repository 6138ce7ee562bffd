//! Strategy vs. buy-and-hold comparison.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use signalbt_core::domain::PortfolioState;

use crate::metrics::{
    evaluate, evaluate_benchmark, underlying_cumulative_returns, underlying_returns, EvalError,
    Metric, MetricsTable, ALGO_LABEL,
};

/// Algo and Underlying statistics side by side, aligned by metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub algo: MetricsTable,
    pub underlying: MetricsTable,
}

impl ComparisonTable {
    /// `(metric, algo, underlying)` rows in display order.
    pub fn rows(&self) -> Vec<(Metric, f64, f64)> {
        Metric::ALL
            .iter()
            .map(|&m| (m, self.algo.get(m), self.underlying.get(m)))
            .collect()
    }

    pub fn has_undefined(&self) -> bool {
        self.algo.has_undefined() || self.underlying.has_undefined()
    }
}

/// One date of the strategy-vs-underlying cumulative return chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub underlying: f64,
    pub algo: f64,
}

/// Evaluate the strategy and buy-and-hold of its own closes.
pub fn compare(state: &PortfolioState) -> Result<ComparisonTable, EvalError> {
    let algo = evaluate(state)?.relabel(ALGO_LABEL);
    let underlying = evaluate_benchmark(&state.closes())?;
    Ok(ComparisonTable { algo, underlying })
}

/// Per-date cumulative returns of the underlying and of the strategy.
///
/// `closes` must be aligned one-to-one with the portfolio records.
pub fn benchmark_cumulative_series(
    state: &PortfolioState,
    closes: &[f64],
) -> Result<Vec<CumulativePoint>, EvalError> {
    if state.is_empty() {
        return Err(EvalError::EmptyState);
    }
    if closes.len() != state.len() {
        return Err(EvalError::LengthMismatch {
            expected: state.len(),
            actual: closes.len(),
        });
    }
    let underlying = underlying_cumulative_returns(&underlying_returns(closes)?);

    Ok(state
        .records()
        .iter()
        .zip(underlying)
        .map(|(record, underlying)| CumulativePoint {
            date: record.date,
            underlying,
            algo: record.cumulative_return,
        })
        .collect())
}
