//! signalbt Core — domain types and the long/flat signal simulator.
//!
//! This crate contains the simulation half of the backtester:
//! - Validated price/signal series (`SignalSeries`)
//! - Single-pass simulation into an immutable `PortfolioState`
//! - Trade record types shared with the evaluator
//! - Run fingerprints (BLAKE3 dataset hash and run id)
//! - Polars/Parquet export of portfolio state

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;

pub use domain::{PortfolioRecord, PortfolioState, SignalBar, SignalSeries, TradeRecord};
pub use engine::{simulate, SimulationConfig};
