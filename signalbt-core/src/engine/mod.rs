//! Simulation engine — converts a signal series into portfolio state.
//!
//! The engine is a single pure pass: validated `SignalSeries` and an explicit
//! `SimulationConfig` in, immutable `PortfolioState` out. No I/O, no shared
//! state, safe to call from several threads on different inputs.

pub mod config;
pub mod simulator;

pub use config::{ConfigError, SimulationConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_SHARE_COUNT};
pub use simulator::{simulate, SimulationError};
