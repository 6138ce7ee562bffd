//! signalbt Runner — evaluation, trade ledger and run orchestration.
//!
//! This crate builds on `signalbt-core` to provide:
//! - Performance metrics for a simulated portfolio and its buy-and-hold benchmark
//! - Algo vs Underlying comparison and per-date cumulative return series
//! - Trade ledger with pending-position reporting
//! - Factor-model-ready return series with chronological train/test split
//! - CSV loading, TOML run configuration and seeded synthetic series
//! - Parallel batch runs and JSON/CSV/Parquet artifact export

pub mod benchmark;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod factors;
pub mod ledger;
pub mod metrics;
pub mod runner;

pub use benchmark::{benchmark_cumulative_series, compare, ComparisonTable, CumulativePoint};
pub use config::{ConfigError, RunConfig};
pub use data_loader::{
    generate_synthetic_series, load_factor_table, load_series, LoadError, LoadOptions,
    SyntheticOptions,
};
pub use factors::{FactorDataset, FactorError, FactorTable, ReturnSeries};
pub use ledger::{trade_ledger, LedgerError, LedgerState, TradeLedger};
pub use metrics::{evaluate, evaluate_benchmark, EvalError, Metric, MetricsTable};
pub use runner::{run_backtest, run_batch, run_file, run_files, BacktestResult, RunError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_types_are_send_sync() {
        assert_send::<MetricsTable>();
        assert_sync::<MetricsTable>();
        assert_send::<ComparisonTable>();
        assert_sync::<ComparisonTable>();
        assert_send::<CumulativePoint>();
        assert_sync::<CumulativePoint>();
    }

    #[test]
    fn ledger_types_are_send_sync() {
        assert_send::<TradeLedger>();
        assert_sync::<TradeLedger>();
        assert_send::<LedgerState>();
        assert_sync::<LedgerState>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn factor_types_are_send_sync() {
        assert_send::<ReturnSeries>();
        assert_sync::<ReturnSeries>();
        assert_send::<FactorDataset>();
        assert_sync::<FactorDataset>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
