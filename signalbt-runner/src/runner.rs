//! Backtest runner — wires together simulation, evaluation and the ledger.
//!
//! Entry points:
//! - `run_backtest()`: one in-memory series. No I/O.
//! - `run_batch()`: independent in-memory series evaluated in parallel.
//! - `run_file()` / `run_files()`: load CSV input, then run.
//!
//! Batch variants return one `Result` per input, in input order, so a bad
//! file never hides the results of the others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use signalbt_core::domain::{PortfolioState, SignalSeries};
use signalbt_core::engine::{simulate, SimulationConfig, SimulationError};
use signalbt_core::fingerprint::RunFingerprint;

use crate::benchmark::{benchmark_cumulative_series, compare, ComparisonTable, CumulativePoint};
use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_series, LoadError};
use crate::ledger::{trade_ledger, LedgerError, TradeLedger};
use crate::metrics::EvalError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub fingerprint: RunFingerprint,
    pub comparison: ComparisonTable,
    pub ledger: TradeLedger,
    pub cumulative: Vec<CumulativePoint>,
    pub state: PortfolioState,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn symbol(&self) -> &str {
        &self.fingerprint.symbol
    }

    pub fn has_pending_position(&self) -> bool {
        self.ledger.pending.is_some()
    }
}

/// Run a single backtest over pre-loaded data.
pub fn run_backtest(
    symbol: &str,
    series: &SignalSeries,
    config: &SimulationConfig,
) -> Result<BacktestResult, RunError> {
    let fingerprint = RunFingerprint::new(symbol, series, config);
    log::debug!(
        "run {} for {symbol}: {} bars, capital {}, {} shares",
        fingerprint.run_id.short(),
        series.len(),
        config.initial_capital,
        config.share_count
    );

    let state = simulate(series, config)?;
    let comparison = compare(&state)?;
    let ledger = trade_ledger(&state)?;
    let cumulative = benchmark_cumulative_series(&state, &state.closes())?;

    if let Some(leg) = &ledger.pending {
        log::warn!(
            "{symbol}: position of {} shares opened {} at {:.4} is still open at end of data",
            leg.shares,
            leg.date,
            leg.price
        );
    }
    if comparison.algo.has_undefined() {
        log::warn!("{symbol}: some strategy ratios are undefined (flat or too-short return series)");
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        comparison,
        ledger,
        cumulative,
        state,
    })
}

/// Run independent series in parallel, preserving input order.
pub fn run_batch(
    inputs: &[(String, SignalSeries)],
    config: &SimulationConfig,
) -> Vec<Result<BacktestResult, RunError>> {
    inputs
        .par_iter()
        .map(|(symbol, series)| run_backtest(symbol, series, config))
        .collect()
}

/// Symbol name for an input file: its stem.
pub fn symbol_for_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one CSV file and run it.
pub fn run_file(path: &Path, config: &RunConfig) -> Result<BacktestResult, RunError> {
    let opts = config.load_options()?;
    let series = load_series(path, &opts)?;
    run_backtest(&symbol_for_path(path), &series, &config.simulation)
}

/// Load and run several CSV files in parallel, preserving input order.
pub fn run_files(paths: &[PathBuf], config: &RunConfig) -> Vec<Result<BacktestResult, RunError>> {
    paths.par_iter().map(|p| run_file(p, config)).collect()
}
