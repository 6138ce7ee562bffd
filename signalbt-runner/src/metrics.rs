//! Performance metrics — pure functions over daily return series.
//!
//! Annual Return and Annual Volatility use the defined daily returns only (the
//! first record of a portfolio has no prior total and is excluded). The
//! Sortino downside mean runs over every period, the first one included as a
//! zero.
//!
//! Degenerate inputs follow one convention throughout:
//! - Annual Return is NaN with no defined returns
//! - Annual Volatility is NaN with fewer than two defined returns
//! - Sharpe and Sortino are NaN when their denominator is below 1e-15

use serde::{Deserialize, Serialize};
use signalbt_core::domain::PortfolioState;
use thiserror::Error;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Denominators below this are treated as zero.
const DEGENERATE_DENOMINATOR: f64 = 1e-15;

pub const BACKTEST_LABEL: &str = "Backtest";
pub const ALGO_LABEL: &str = "Algo";
pub const UNDERLYING_LABEL: &str = "Underlying";

/// Errors from the evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("portfolio state is empty")]
    EmptyState,

    #[error("close series is empty")]
    EmptyCloses,

    #[error("close series has {actual} values, portfolio state has {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("close at index {index} must be finite and positive, got {close}")]
    InvalidClose { index: usize, close: f64 },
}

/// The five reported statistics, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    AnnualReturn,
    CumulativeReturns,
    AnnualVolatility,
    SharpeRatio,
    SortinoRatio,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::AnnualReturn,
        Metric::CumulativeReturns,
        Metric::AnnualVolatility,
        Metric::SharpeRatio,
        Metric::SortinoRatio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::AnnualReturn => "Annual Return",
            Metric::CumulativeReturns => "Cumulative Returns",
            Metric::AnnualVolatility => "Annual Volatility",
            Metric::SharpeRatio => "Sharpe Ratio",
            Metric::SortinoRatio => "Sortino Ratio",
        }
    }
}

/// A labelled column of performance statistics.
///
/// NaN values serialize as JSON `null` and read back as NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsTable {
    pub label: String,
    #[serde(with = "nan_as_null")]
    pub annual_return: f64,
    #[serde(with = "nan_as_null")]
    pub cumulative_returns: f64,
    #[serde(with = "nan_as_null")]
    pub annual_volatility: f64,
    #[serde(with = "nan_as_null")]
    pub sharpe_ratio: f64,
    #[serde(with = "nan_as_null")]
    pub sortino_ratio: f64,
}

impl MetricsTable {
    /// Compute all statistics from defined daily returns and the final
    /// compounded return.
    ///
    /// `periods` is the full series length, including periods whose return is
    /// undefined; those count as zero in the downside mean.
    pub fn from_returns(
        label: &str,
        returns: &[f64],
        periods: usize,
        cumulative_returns: f64,
    ) -> Self {
        let annual_return = annual_return(returns);
        let annual_volatility = annual_volatility(returns);
        Self {
            label: label.to_string(),
            annual_return,
            cumulative_returns,
            annual_volatility,
            sharpe_ratio: ratio(annual_return, annual_volatility),
            sortino_ratio: ratio(annual_return, downside_deviation(returns, periods)),
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::AnnualReturn => self.annual_return,
            Metric::CumulativeReturns => self.cumulative_returns,
            Metric::AnnualVolatility => self.annual_volatility,
            Metric::SharpeRatio => self.sharpe_ratio,
            Metric::SortinoRatio => self.sortino_ratio,
        }
    }

    /// `(metric, value)` pairs in display order.
    pub fn rows(&self) -> Vec<(Metric, f64)> {
        Metric::ALL.iter().map(|&m| (m, self.get(m))).collect()
    }

    pub fn relabel(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// True if any statistic is NaN.
    pub fn has_undefined(&self) -> bool {
        Metric::ALL.iter().any(|&m| self.get(m).is_nan())
    }
}

/// Bitwise equality, so NaN compares equal to NaN.
impl PartialEq for MetricsTable {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && Metric::ALL
                .iter()
                .all(|&m| self.get(m).to_bits() == other.get(m).to_bits())
    }
}

// ─── Entry points ───────────────────────────────────────────────────

/// Score a simulated portfolio. Labelled "Backtest".
pub fn evaluate(state: &PortfolioState) -> Result<MetricsTable, EvalError> {
    if state.is_empty() {
        return Err(EvalError::EmptyState);
    }
    let returns = state.defined_returns();
    log::debug!("evaluating portfolio over {} defined returns", returns.len());
    Ok(MetricsTable::from_returns(
        BACKTEST_LABEL,
        &returns,
        state.len(),
        state.final_cumulative_return(),
    ))
}

/// Score buy-and-hold of the underlying closes. Labelled "Underlying".
pub fn evaluate_benchmark(closes: &[f64]) -> Result<MetricsTable, EvalError> {
    let returns = underlying_returns(closes)?;
    let cumulative = underlying_cumulative_returns(&returns).last().copied().unwrap_or(0.0);
    Ok(MetricsTable::from_returns(
        UNDERLYING_LABEL,
        &returns[1..],
        returns.len(),
        cumulative,
    ))
}

// ─── Return series ──────────────────────────────────────────────────

/// Close-to-close percentage changes, aligned with `closes`.
///
/// The first element is 0.0 (no prior close). Callers computing statistics
/// skip it.
pub fn underlying_returns(closes: &[f64]) -> Result<Vec<f64>, EvalError> {
    validate_closes(closes)?;
    let mut returns = Vec::with_capacity(closes.len());
    returns.push(0.0);
    for w in closes.windows(2) {
        returns.push((w[1] - w[0]) / w[0]);
    }
    Ok(returns)
}

/// Compounded product of `1 + r` minus one, aligned with `returns`.
pub fn underlying_cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth - 1.0
        })
        .collect()
}

fn validate_closes(closes: &[f64]) -> Result<(), EvalError> {
    if closes.is_empty() {
        return Err(EvalError::EmptyCloses);
    }
    for (index, &close) in closes.iter().enumerate() {
        if !close.is_finite() || close <= 0.0 {
            return Err(EvalError::InvalidClose { index, close });
        }
    }
    Ok(())
}

// ─── Individual statistics ──────────────────────────────────────────

/// Mean daily return × 252. NaN for an empty series.
pub fn annual_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    mean_f64(returns) * TRADING_DAYS_PER_YEAR
}

/// Sample standard deviation (n−1) × √252. NaN for fewer than two returns.
pub fn annual_volatility(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized downside deviation: √(Σ min(r, 0)² / periods) × √252.
///
/// The mean runs over every period, not only the losing ones. Periods beyond
/// `returns.len()` contribute zero. NaN when `periods` is zero.
pub fn downside_deviation(returns: &[f64], periods: usize) -> f64 {
    let periods = periods.max(returns.len());
    if periods == 0 {
        return f64::NAN;
    }
    let downside_sq: f64 = returns.iter().map(|r| r.min(0.0).powi(2)).sum();
    (downside_sq / periods as f64).sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio (zero risk-free rate).
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    ratio(annual_return(returns), annual_volatility(returns))
}

/// Annualized Sortino ratio (zero target) over `periods` periods.
pub fn sortino_ratio(returns: &[f64], periods: usize) -> f64 {
    ratio(annual_return(returns), downside_deviation(returns, periods))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.is_nan() || denominator < DEGENERATE_DENOMINATOR {
        return f64::NAN;
    }
    numerator / denominator
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_return_scales_mean() {
        let r = [0.01, -0.005, 0.002];
        let expected = (0.01 - 0.005 + 0.002) / 3.0 * 252.0;
        assert!((annual_return(&r) - expected).abs() < 1e-12);
    }

    #[test]
    fn annual_volatility_uses_sample_std() {
        let r = [0.01, 0.03];
        // mean 0.02, sample var = (0.0001 + 0.0001) / 1
        let expected = 0.0002_f64.sqrt() * 252.0_f64.sqrt();
        assert!((annual_volatility(&r) - expected).abs() < 1e-12);
    }

    #[test]
    fn downside_mean_runs_over_all_periods() {
        let r = [0.02, -0.02, 0.0, 0.0];
        let expected = (0.0004_f64 / 4.0).sqrt() * 252.0_f64.sqrt();
        assert!((downside_deviation(&r, 4) - expected).abs() < 1e-12);
    }

    #[test]
    fn downside_mean_counts_undefined_periods_as_zero() {
        let r = [0.02, -0.02, 0.0, 0.0];
        let expected = (0.0004_f64 / 5.0).sqrt() * 252.0_f64.sqrt();
        assert!((downside_deviation(&r, 5) - expected).abs() < 1e-12);
        assert!(downside_deviation(&[], 0).is_nan());
        assert_eq!(downside_deviation(&[], 1), 0.0);
    }

    #[test]
    fn sharpe_is_nan_for_constant_returns() {
        assert!(sharpe_ratio(&[0.0; 10]).is_nan());
        assert!(sharpe_ratio(&[0.01; 10]).is_nan());
    }

    #[test]
    fn sortino_is_nan_without_downside() {
        assert!(sortino_ratio(&[0.01, 0.02, 0.0], 4).is_nan());
    }

    #[test]
    fn empty_and_single_return_conventions() {
        assert!(annual_return(&[]).is_nan());
        assert!(annual_volatility(&[]).is_nan());
        assert!(!annual_return(&[0.01]).is_nan());
        assert!(annual_volatility(&[0.01]).is_nan());
        assert!(sharpe_ratio(&[0.01]).is_nan());
    }

    #[test]
    fn underlying_returns_start_at_zero() {
        let r = underlying_returns(&[10.0, 11.0, 9.9]).unwrap();
        assert_eq!(r[0], 0.0);
        assert!((r[1] - 0.1).abs() < 1e-12);
        assert!((r[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn underlying_rejects_bad_closes() {
        assert_eq!(underlying_returns(&[]), Err(EvalError::EmptyCloses));
        assert_eq!(
            underlying_returns(&[10.0, 0.0]),
            Err(EvalError::InvalidClose { index: 1, close: 0.0 })
        );
        assert!(matches!(
            underlying_returns(&[f64::NAN]),
            Err(EvalError::InvalidClose { index: 0, .. })
        ));
    }

    #[test]
    fn benchmark_cumulative_is_price_ratio() {
        let table = evaluate_benchmark(&[10.0, 12.0, 15.0]).unwrap();
        assert_eq!(table.label, UNDERLYING_LABEL);
        assert!((table.cumulative_returns - 0.5).abs() < 1e-12);
    }

    #[test]
    fn benchmark_sortino_counts_first_close() {
        // returns 0.2, -0.25 over three closes
        let table = evaluate_benchmark(&[10.0, 12.0, 9.0]).unwrap();
        let annual = (0.2 - 0.25) / 2.0 * 252.0;
        let downside = (0.0625_f64 / 3.0).sqrt() * 252.0_f64.sqrt();
        assert!((table.sortino_ratio - annual / downside).abs() < 1e-12);
    }

    #[test]
    fn single_close_benchmark_is_all_undefined_but_cumulative() {
        let table = evaluate_benchmark(&[10.0]).unwrap();
        assert_eq!(table.cumulative_returns, 0.0);
        assert!(table.annual_return.is_nan());
        assert!(table.has_undefined());
    }

    #[test]
    fn rows_follow_display_order() {
        let table = MetricsTable::from_returns("x", &[0.01, -0.01, 0.02], 4, 0.02);
        let labels: Vec<&str> = table.rows().iter().map(|(m, _)| m.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Annual Return",
                "Cumulative Returns",
                "Annual Volatility",
                "Sharpe Ratio",
                "Sortino Ratio"
            ]
        );
    }

    #[test]
    fn nan_survives_json_roundtrip() {
        let table = MetricsTable::from_returns("x", &[0.0, 0.0], 3, 0.0);
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"sharpe_ratio\":null"));
        let back: MetricsTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
