//! signalbt CLI — run and synthetic commands.
//!
//! Commands:
//! - `run` — backtest one or more signal CSV files and print Algo vs
//!   Underlying metrics, the trade ledger summary and any pending position
//! - `synthetic` — write a seeded random-walk signal CSV for demos

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use signalbt_core::engine::SimulationConfig;
use signalbt_runner::export::{export_series_csv, save_artifacts, save_factor_split};
use signalbt_runner::factors::ReturnSeries;
use signalbt_runner::{
    generate_synthetic_series, load_factor_table, run_files, BacktestResult, FactorTable,
    RunConfig, SyntheticOptions,
};

#[derive(Parser)]
#[command(
    name = "signalbt",
    about = "signalbt — long/flat signal backtester with benchmark comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest signal CSV files (columns: date, close, buy_signal).
    Run {
        /// Input CSV files. Each file is one independent run, named by its stem.
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Path to a TOML run config ([simulation], [data], [factors] tables).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Starting cash. Overrides the config file.
        #[arg(long)]
        initial_capital: Option<f64>,

        /// Shares bought on entry. Overrides the config file.
        #[arg(long)]
        share_count: Option<u64>,

        /// Factor CSV (date plus factor columns) to join with strategy returns.
        #[arg(long)]
        factors: Option<PathBuf>,

        /// Train share for the factor dataset split. Overrides the config file.
        #[arg(long)]
        split_rate: Option<f64>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print results only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Write a deterministic synthetic signal CSV.
    Synthetic {
        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,

        /// Number of trading days.
        #[arg(long, default_value_t = 504)]
        days: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Moving-average lookback driving the signal.
        #[arg(long, default_value_t = 20)]
        ma_window: usize,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            inputs,
            config,
            initial_capital,
            share_count,
            factors,
            split_rate,
            output_dir,
            no_artifacts,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfig::from_file(&path)?,
                None => RunConfig::default(),
            };
            apply_overrides(&mut run_config.simulation, initial_capital, share_count);
            if let Some(rate) = split_rate {
                run_config.factors.split_rate = rate;
            }
            run_config.validate()?;

            let artifacts_dir = if no_artifacts { None } else { Some(output_dir) };
            run_cmd(&inputs, &run_config, factors, artifacts_dir)
        }
        Commands::Synthetic {
            output,
            days,
            seed,
            start,
            ma_window,
        } => run_synthetic(output, days, seed, &start, ma_window),
    }
}

fn apply_overrides(
    simulation: &mut SimulationConfig,
    initial_capital: Option<f64>,
    share_count: Option<u64>,
) {
    if let Some(capital) = initial_capital {
        simulation.initial_capital = capital;
    }
    if let Some(shares) = share_count {
        simulation.share_count = shares;
    }
}

fn run_cmd(
    inputs: &[PathBuf],
    config: &RunConfig,
    factors_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let factor_table = factors_path
        .map(|path| {
            let opts = config.load_options()?;
            load_factor_table(&path, &opts)
                .with_context(|| format!("failed to load factors from {}", path.display()))
        })
        .transpose()?;

    log::info!(
        "running {} input(s) with capital {} and {} shares",
        inputs.len(),
        config.simulation.initial_capital,
        config.simulation.share_count
    );

    let mut failures = 0;
    for (path, outcome) in inputs.iter().zip(run_files(inputs, config)) {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Error for {}: {e}", path.display());
                failures += 1;
                continue;
            }
        };

        print_summary(&result);

        if let Some(dir) = &output_dir {
            let run_dir = save_artifacts(&result, dir)?;
            if let Some(table) = &factor_table {
                save_factors(&result, table, config.factors.split_rate, &run_dir)?;
            }
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }

    if failures > 0 {
        bail!("{failures} of {} run(s) failed", inputs.len());
    }
    Ok(())
}

fn save_factors(
    result: &BacktestResult,
    table: &FactorTable,
    split_rate: f64,
    run_dir: &std::path::Path,
) -> Result<()> {
    let dataset = ReturnSeries::from_state(&result.state).join_factors(table);
    if dataset.is_empty() {
        log::warn!(
            "{}: no dates in common with the factor table, skipping factor export",
            result.symbol()
        );
        return Ok(());
    }
    let (train, test) = save_factor_split(&dataset, split_rate, run_dir)?;
    log::info!(
        "{}: factor dataset of {} rows split into {} and {}",
        result.symbol(),
        dataset.len(),
        train.display(),
        test.display()
    );
    Ok(())
}

fn run_synthetic(
    output: PathBuf,
    days: usize,
    seed: u64,
    start: &str,
    ma_window: usize,
) -> Result<()> {
    if days == 0 {
        bail!("--days must be positive");
    }
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date '{start}' (expected YYYY-MM-DD)"))?;

    let series = generate_synthetic_series(&SyntheticOptions {
        start,
        days,
        seed,
        ma_window,
    })?;
    std::fs::write(&output, export_series_csv(&series)?)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Wrote {} rows ({} to {}) to {}",
        series.len(),
        series.first_date(),
        series.last_date(),
        output.display()
    );
    Ok(())
}

/// Format a metric value, printing undefined ratios as `n/a`.
fn fmt_metric(v: f64, pct: bool) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else if pct {
        format!("{:.2}%", v * 100.0)
    } else {
        format!("{:.3}", v)
    }
}

fn print_summary(result: &BacktestResult) {
    use signalbt_runner::Metric;

    let fp = &result.fingerprint;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", fp.symbol);
    println!("Period:         {} to {}", fp.start_date, fp.end_date);
    println!("Bars:           {}", fp.bar_count);
    println!(
        "Capital:        {:.2} ({} shares per entry)",
        fp.config.initial_capital, fp.config.share_count
    );
    println!("Run ID:         {}", fp.run_id.short());
    println!();

    println!("--- Performance ---");
    println!("{:<20} {:>12} {:>12}", "", "Algo", "Underlying");
    for (metric, algo, underlying) in result.comparison.rows() {
        let pct = matches!(
            metric,
            Metric::AnnualReturn | Metric::CumulativeReturns | Metric::AnnualVolatility
        );
        println!(
            "{:<20} {:>12} {:>12}",
            metric.label(),
            fmt_metric(algo, pct),
            fmt_metric(underlying, pct)
        );
    }
    if result.comparison.has_undefined() {
        println!("(n/a: ratio undefined for a flat or too-short return series)");
    }
    println!();

    let ledger = &result.ledger;
    println!("--- Trades ---");
    println!("Closed trades:  {}", ledger.trades.len());
    println!("Winners:        {}", ledger.winners());
    println!("Win Rate:       {:.1}%", ledger.win_rate() * 100.0);
    println!("Total P/L:      {:.2}", ledger.total_profit_loss());
    if let Some(leg) = &ledger.pending {
        println!();
        println!(
            "PENDING: {} shares bought {} at {:.4} still open",
            leg.shares, leg.date, leg.price
        );
    }
    println!();
}
