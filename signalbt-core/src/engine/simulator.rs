//! Signal simulator — turns a long/flat signal into a portfolio state series.
//!
//! Single forward pass over the input. Sizing is binary: either
//! `share_count` shares or nothing. The state before the first row is taken
//! as flat, so a series that opens long buys on the first row and the
//! running position never drifts from the signal.

use log::debug;
use thiserror::Error;

use super::config::{ConfigError, SimulationConfig};
use crate::domain::{PortfolioRecord, PortfolioState, SignalSeries};

/// Errors from [`simulate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {0}")]
    Config(#[from] ConfigError),
}

/// Simulate a fixed-size long/flat portfolio over `series`.
///
/// Per row `t`:
/// - `position = share_count * signal`
/// - `entry_exit = signal(t) - signal(t-1)`, `None` at `t = 0`
/// - `entry_exit_position = position(t) - position(t-1)`, with a flat prior state
/// - `holdings = close * Σ entry_exit_position`
/// - `cash = initial_capital - Σ close * entry_exit_position`
/// - `total = holdings + cash`
/// - `daily_return = total(t) / total(t-1) - 1`, `None` at `t = 0`
/// - `cumulative_return = Π (1 + daily_return) - 1`, zero at `t = 0`
pub fn simulate(
    series: &SignalSeries,
    config: &SimulationConfig,
) -> Result<PortfolioState, SimulationError> {
    config.validate()?;

    let shares = config.shares();
    let mut records = Vec::with_capacity(series.len());

    let mut prev_signal: Option<u8> = None;
    let mut prev_position = 0_i64;
    let mut prev_total: Option<f64> = None;
    let mut held_shares = 0_i64;
    let mut spent = 0.0_f64;
    let mut growth = 1.0_f64;

    for bar in series.bars() {
        let position = shares * i64::from(bar.buy_signal);
        let entry_exit = prev_signal.map(|prev| bar.buy_signal as i8 - prev as i8);
        let delta = position - prev_position;

        held_shares += delta;
        spent += bar.close * delta as f64;

        let holdings = bar.close * held_shares as f64;
        let cash = config.initial_capital - spent;
        let total = holdings + cash;

        let daily_return = prev_total.map(|prev| (total - prev) / prev);
        if let Some(r) = daily_return {
            growth *= 1.0 + r;
        }

        records.push(PortfolioRecord {
            date: bar.date,
            close: bar.close,
            buy_signal: bar.buy_signal,
            position,
            entry_exit,
            entry_exit_position: delta,
            holdings,
            cash,
            total,
            daily_return,
            cumulative_return: growth - 1.0,
        });

        prev_signal = Some(bar.buy_signal);
        prev_position = position;
        prev_total = Some(total);
    }

    debug!(
        "simulated {} rows ({} to {}), final total {:.2}",
        records.len(),
        series.first_date(),
        series.last_date(),
        prev_total.unwrap_or(config.initial_capital),
    );

    Ok(PortfolioState::from_simulation(*config, records))
}
