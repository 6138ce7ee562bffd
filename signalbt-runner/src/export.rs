//! Reporting and export — JSON, CSV and Parquet artifact generation.
//!
//! Provides the persisted forms of a backtest result:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: portfolio state, trade ledger, comparison table and cumulative
//!   series for external analysis tools
//! - **Parquet**: portfolio state and return series as typed columns
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load. Undefined values are written as empty CSV cells.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use signalbt_core::data::{portfolio_frame, write_parquet};
use signalbt_core::domain::{PortfolioState, SignalSeries};

use crate::benchmark::{ComparisonTable, CumulativePoint};
use crate::factors::{FactorDataset, ReturnSeries};
use crate::ledger::TradeLedger;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

fn cell(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:.6}")
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Input series in the layout `load_series` reads by default.
pub fn export_series_csv(series: &SignalSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "close", "buy_signal"])?;
    for bar in series.bars() {
        wtr.write_record([
            &bar.date.to_string(),
            &format!("{:.6}", bar.close),
            &bar.buy_signal.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Full portfolio state, one row per date.
pub fn export_state_csv(state: &PortfolioState) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "close",
        "buy_signal",
        "position",
        "entry_exit",
        "entry_exit_position",
        "portfolio_holdings",
        "portfolio_cash",
        "portfolio_total",
        "portfolio_daily_returns",
        "portfolio_cumulative_returns",
    ])?;

    for r in state.records() {
        wtr.write_record([
            &r.date.to_string(),
            &format!("{:.6}", r.close),
            &r.buy_signal.to_string(),
            &r.position.to_string(),
            &r.entry_exit.map(|v| v.to_string()).unwrap_or_default(),
            &r.entry_exit_position.to_string(),
            &format!("{:.2}", r.holdings),
            &format!("{:.2}", r.cash),
            &format!("{:.2}", r.total),
            &r.daily_return.map(cell).unwrap_or_default(),
            &cell(r.cumulative_return),
        ])?;
    }
    finish(wtr)
}

/// Closed trades, followed by the pending leg (blank exit columns) if any.
pub fn export_trades_csv(ledger: &TradeLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_date",
        "entry_price",
        "entry_total",
        "exit_index",
        "exit_date",
        "exit_price",
        "exit_total",
        "shares",
        "profit_loss",
        "status",
    ])?;

    for t in &ledger.trades {
        wtr.write_record([
            t.entry_index.to_string().as_str(),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.2}", t.entry_total),
            &t.exit_index.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.2}", t.exit_total),
            &t.shares.to_string(),
            &format!("{:.2}", t.profit_loss),
            "closed",
        ])?;
    }

    if let Some(leg) = &ledger.pending {
        wtr.write_record([
            leg.index.to_string().as_str(),
            &leg.date.to_string(),
            &format!("{:.6}", leg.price),
            &format!("{:.2}", leg.total),
            "",
            "",
            "",
            "",
            &leg.shares.to_string(),
            "",
            "pending",
        ])?;
    }
    finish(wtr)
}

/// Metric rows with Algo and Underlying columns.
pub fn export_comparison_csv(table: &ComparisonTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", &table.algo.label, &table.underlying.label])?;
    for (metric, algo, underlying) in table.rows() {
        wtr.write_record([metric.label(), &cell(algo), &cell(underlying)])?;
    }
    finish(wtr)
}

pub fn export_cumulative_csv(points: &[CumulativePoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "underlying", "algo"])?;
    for p in points {
        wtr.write_record([&p.date.to_string(), &cell(p.underlying), &cell(p.algo)])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_{short run id}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `state.csv` / `state.parquet` — portfolio state
/// - `trades.csv` — trade ledger including any pending leg
/// - `comparison.csv` — Algo vs Underlying metrics
/// - `cumulative.csv` — per-date cumulative returns
/// - `returns.parquet` — dated daily returns for factor models
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", result.symbol(), result.fingerprint.run_id.short());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("state.csv"), export_state_csv(&result.state)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.ledger)?)?;
    std::fs::write(
        run_dir.join("comparison.csv"),
        export_comparison_csv(&result.comparison)?,
    )?;
    std::fs::write(
        run_dir.join("cumulative.csv"),
        export_cumulative_csv(&result.cumulative)?,
    )?;

    let state_frame = portfolio_frame(&result.state).context("failed to build state frame")?;
    write_parquet(&state_frame, &run_dir.join("state.parquet"))
        .context("failed to write state.parquet")?;
    let returns_frame = ReturnSeries::from_state(&result.state)
        .to_frame()
        .context("failed to build returns frame")?;
    write_parquet(&returns_frame, &run_dir.join("returns.parquet"))
        .context("failed to write returns.parquet")?;

    log::debug!("saved artifacts to {}", run_dir.display());
    Ok(run_dir)
}

/// Write the train/test split of a factor dataset as two Parquet files.
///
/// Returns the `(train, test)` paths.
pub fn save_factor_split(
    dataset: &FactorDataset,
    rate: f64,
    dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let (train, test) = dataset.split(rate).context("failed to split factor dataset")?;
    let train_path = dir.join("factors_train.parquet");
    let test_path = dir.join("factors_test.parquet");
    train
        .write_parquet(&train_path)
        .context("failed to write factors_train.parquet")?;
    test.write_parquet(&test_path)
        .context("failed to write factors_test.parquet")?;
    Ok((train_path, test_path))
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
