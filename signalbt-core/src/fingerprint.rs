//! Run fingerprinting — deterministic identification of simulation runs.
//!
//! - `dataset_hash()`: BLAKE3 over every input row (date, close bits, signal).
//! - `run_id()`: BLAKE3 over the canonical config JSON plus the dataset hash.
//! - `RunFingerprint`: the identity block persisted with every result.

use crate::domain::{DatasetHash, RunId, SignalSeries};
use crate::engine::SimulationConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Content hash of an input series.
///
/// Two series hash equal only if every date, close (bitwise) and signal match.
pub fn dataset_hash(series: &SignalSeries) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for bar in series.bars() {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&[bar.buy_signal]);
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}

/// Deterministic id for running `config` over the dataset identified by `dataset`.
pub fn run_id(config: &SimulationConfig, dataset: &DatasetHash) -> RunId {
    // Canonical serialization (fixed key order)
    let canonical = json!({
        "dataset_hash": &dataset.0,
        "initial_capital": config.initial_capital.to_bits(),
        "share_count": config.share_count,
    });
    RunId(blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string())
}

/// Identity of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: RunId,
    pub dataset_hash: DatasetHash,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub config: SimulationConfig,
}

impl RunFingerprint {
    pub fn new(symbol: &str, series: &SignalSeries, config: &SimulationConfig) -> Self {
        let dataset_hash = dataset_hash(series);
        Self {
            run_id: run_id(config, &dataset_hash),
            dataset_hash,
            symbol: symbol.to_string(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            bar_count: series.len(),
            config: *config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalBar;

    fn sample_series(last_close: f64) -> SignalSeries {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        SignalSeries::new(vec![
            SignalBar::new(d(2), 10.0, 0),
            SignalBar::new(d(3), 11.0, 1),
            SignalBar::new(d(4), last_close, 0),
        ])
        .unwrap()
    }

    #[test]
    fn dataset_hash_is_deterministic() {
        assert_eq!(dataset_hash(&sample_series(12.0)), dataset_hash(&sample_series(12.0)));
    }

    #[test]
    fn dataset_hash_changes_with_data() {
        assert_ne!(dataset_hash(&sample_series(12.0)), dataset_hash(&sample_series(12.5)));
    }

    #[test]
    fn run_id_changes_with_config() {
        let hash = dataset_hash(&sample_series(12.0));
        let a = run_id(&SimulationConfig::default(), &hash);
        let b = run_id(&SimulationConfig::new(100_000.0, 500).unwrap(), &hash);
        assert_eq!(a, run_id(&SimulationConfig::default(), &hash));
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_captures_range() {
        let fp = RunFingerprint::new("PETR4", &sample_series(12.0), &SimulationConfig::default());
        assert_eq!(fp.symbol, "PETR4");
        assert_eq!(fp.bar_count, 3);
        assert_eq!(fp.start_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(fp.end_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(fp.run_id.0.len(), 64);
    }
}
