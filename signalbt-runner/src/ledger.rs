//! Trade ledger — pairs entry and exit events into round-trip trades.
//!
//! Single pass over the portfolio records with an explicit state machine:
//! `Flat` until an entry opens a leg, `Open` until the matching exit closes
//! it. A record-0 long position (no prior signal to difference against)
//! counts as an entry. A leg still open at the end of the series is
//! reported as `pending`, not as an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use signalbt_core::domain::{OpenLeg, PortfolioRecord, PortfolioState, TradeRecord};
use thiserror::Error;

/// Event sequences the ledger cannot pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("portfolio state is empty")]
    EmptyState,

    #[error("exit at record {index} ({date}) with no open position")]
    UnmatchedExit { index: usize, date: NaiveDate },

    #[error("entry at record {index} ({date}) while the position opened at record {open_index} is still open")]
    OverlappingEntry {
        index: usize,
        date: NaiveDate,
        open_index: usize,
    },
}

/// Ledger state between records.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerState {
    Flat,
    Open(OpenLeg),
}

/// Closed trades in exit order, plus any position still open at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLedger {
    pub trades: Vec<TradeRecord>,
    pub pending: Option<OpenLeg>,
}

impl TradeLedger {
    pub fn total_profit_loss(&self) -> f64 {
        self.trades.iter().map(|t| t.profit_loss).sum()
    }

    pub fn winners(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    /// Fraction of closed trades with positive P/L, 0.0 with no trades.
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.winners() as f64 / self.trades.len() as f64
    }
}

fn is_entry(index: usize, record: &PortfolioRecord) -> bool {
    record.is_entry()
        || (index == 0 && record.entry_exit.is_none() && record.entry_exit_position > 0)
}

fn open_leg(index: usize, record: &PortfolioRecord) -> OpenLeg {
    OpenLeg {
        index,
        date: record.date,
        total: record.total,
        shares: record.entry_exit_position,
        price: record.close,
    }
}

/// Build the trade ledger for a simulated portfolio.
pub fn trade_ledger(state: &PortfolioState) -> Result<TradeLedger, LedgerError> {
    if state.is_empty() {
        return Err(LedgerError::EmptyState);
    }

    let mut trades = Vec::new();
    let mut ledger_state = LedgerState::Flat;

    for (index, record) in state.records().iter().enumerate() {
        if is_entry(index, record) {
            ledger_state = match ledger_state {
                LedgerState::Flat => LedgerState::Open(open_leg(index, record)),
                LedgerState::Open(leg) => {
                    return Err(LedgerError::OverlappingEntry {
                        index,
                        date: record.date,
                        open_index: leg.index,
                    })
                }
            };
        } else if record.is_exit() {
            ledger_state = match ledger_state {
                LedgerState::Open(leg) => {
                    trades.push(TradeRecord::close(
                        &leg,
                        index,
                        record.date,
                        record.close,
                        record.total,
                    ));
                    LedgerState::Flat
                }
                LedgerState::Flat => {
                    return Err(LedgerError::UnmatchedExit {
                        index,
                        date: record.date,
                    })
                }
            };
        }
    }

    let pending = match ledger_state {
        LedgerState::Open(leg) => Some(leg),
        LedgerState::Flat => None,
    };
    Ok(TradeLedger { trades, pending })
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalbt_core::domain::{SignalBar, SignalSeries};
    use signalbt_core::engine::{simulate, SimulationConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn simulated(signals: &[u8], closes: &[f64]) -> PortfolioState {
        let bars = signals
            .iter()
            .zip(closes)
            .enumerate()
            .map(|(i, (&s, &c))| SignalBar::new(day(i as u32 + 1), c, s))
            .collect();
        let series = SignalSeries::new(bars).unwrap();
        simulate(&series, &SimulationConfig::new(1_000.0, 100).unwrap()).unwrap()
    }

    fn raw(index: u32, position: i64, delta: i64, flag: Option<i8>) -> PortfolioRecord {
        PortfolioRecord {
            date: day(index + 1),
            close: 10.0,
            buy_signal: u8::from(position > 0),
            position,
            entry_exit: flag,
            entry_exit_position: delta,
            holdings: 10.0 * position as f64,
            cash: 1_000.0 - 10.0 * position as f64,
            total: 1_000.0,
            daily_return: flag.map(|_| 0.0),
            cumulative_return: 0.0,
        }
    }

    fn from_raw(records: Vec<PortfolioRecord>) -> PortfolioState {
        PortfolioState::from_records(SimulationConfig::new(1_000.0, 100).unwrap(), records)
            .unwrap()
    }

    #[test]
    fn single_round_trip() {
        let state = simulated(&[0, 0, 1, 1, 0], &[10.0, 10.0, 12.0, 13.0, 11.0]);
        let ledger = trade_ledger(&state).unwrap();

        assert_eq!(ledger.trades.len(), 1);
        assert!(ledger.pending.is_none());
        let t = &ledger.trades[0];
        assert_eq!((t.entry_index, t.exit_index), (2, 4));
        assert_eq!(t.entry_price, 12.0);
        assert_eq!(t.exit_price, 11.0);
        assert_eq!(t.shares, 100);
        assert_eq!(t.entry_total, 1_000.0);
        assert_eq!(t.exit_total, 900.0);
        assert_eq!(t.profit_loss, -100.0);
    }

    #[test]
    fn trailing_open_position_is_pending() {
        let state = simulated(&[0, 1, 0, 1], &[10.0, 10.0, 11.0, 12.0]);
        let ledger = trade_ledger(&state).unwrap();
        assert_eq!(ledger.trades.len(), 1);
        let pending = ledger.pending.unwrap();
        assert_eq!(pending.index, 3);
        assert_eq!(pending.price, 12.0);
    }

    #[test]
    fn series_opening_long_counts_as_entry() {
        let state = simulated(&[1, 1, 0], &[10.0, 11.0, 12.0]);
        let ledger = trade_ledger(&state).unwrap();
        assert_eq!(ledger.trades.len(), 1);
        assert_eq!(ledger.trades[0].entry_index, 0);
        assert_eq!(ledger.trades[0].exit_index, 2);
        assert!((ledger.trades[0].profit_loss - 200.0).abs() < 1e-9);
    }

    #[test]
    fn never_trading_yields_empty_ledger() {
        let ledger = trade_ledger(&simulated(&[0, 0, 0], &[10.0, 11.0, 12.0])).unwrap();
        assert!(ledger.trades.is_empty());
        assert!(ledger.pending.is_none());
        assert_eq!(ledger.win_rate(), 0.0);
    }

    #[test]
    fn exit_without_entry_is_rejected() {
        let state = from_raw(vec![raw(0, 0, 0, None), raw(1, 0, 0, Some(-1))]);
        assert_eq!(
            trade_ledger(&state),
            Err(LedgerError::UnmatchedExit { index: 1, date: day(2) })
        );
    }

    #[test]
    fn entry_while_open_is_rejected() {
        let state = from_raw(vec![
            raw(0, 0, 0, None),
            raw(1, 100, 100, Some(1)),
            raw(2, 100, 0, Some(1)),
        ]);
        assert_eq!(
            trade_ledger(&state),
            Err(LedgerError::OverlappingEntry {
                index: 2,
                date: day(3),
                open_index: 1
            })
        );
    }

    #[test]
    fn aggregates_over_trades() {
        let state = simulated(&[0, 1, 0, 1, 0], &[10.0, 10.0, 12.0, 12.0, 11.0]);
        let ledger = trade_ledger(&state).unwrap();
        assert_eq!(ledger.trades.len(), 2);
        assert_eq!(ledger.winners(), 1);
        assert!((ledger.total_profit_loss() - 100.0).abs() < 1e-9);
        assert!((ledger.win_rate() - 0.5).abs() < 1e-12);
    }
}
