//! TradeRecord — a completed entry → exit round trip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The entry side of a round trip, held until the matching exit arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLeg {
    pub index: usize,
    pub date: NaiveDate,
    /// Portfolio total at the entry date.
    pub total: f64,
    pub shares: i64,
    pub price: f64,
}

/// A closed round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub entry_total: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    /// Absolute portfolio total at the exit date.
    pub exit_total: f64,

    // ── Size ──
    pub shares: i64,

    // ── PnL ──
    /// `exit_total - entry_total`.
    pub profit_loss: f64,
}

impl TradeRecord {
    /// Close `leg` at the given exit row.
    pub fn close(
        leg: &OpenLeg,
        exit_index: usize,
        exit_date: NaiveDate,
        exit_price: f64,
        exit_total: f64,
    ) -> Self {
        let exit_total = exit_total.abs();
        Self {
            entry_index: leg.index,
            entry_date: leg.date,
            entry_price: leg.price,
            entry_total: leg.total,
            exit_index,
            exit_date,
            exit_price,
            exit_total,
            shares: leg.shares,
            profit_loss: exit_total - leg.total,
        }
    }

    /// Profit/loss as a fraction of the portfolio total at entry.
    pub fn return_pct(&self) -> f64 {
        if self.entry_total == 0.0 {
            return 0.0;
        }
        self.profit_loss / self.entry_total
    }

    pub fn is_winner(&self) -> bool {
        self.profit_loss > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg() -> OpenLeg {
        OpenLeg {
            index: 2,
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            total: 1_000.0,
            shares: 100,
            price: 12.0,
        }
    }

    #[test]
    fn close_computes_profit_loss() {
        let exit_date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let trade = TradeRecord::close(&leg(), 4, exit_date, 11.0, 900.0);
        assert_eq!(trade.shares, 100);
        assert_eq!(trade.bars_held(), 2);
        assert!((trade.profit_loss - (-100.0)).abs() < 1e-10);
        assert!((trade.return_pct() - (-0.1)).abs() < 1e-10);
        assert!(!trade.is_winner());
    }

    #[test]
    fn exit_total_is_absolute() {
        let exit_date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let trade = TradeRecord::close(&leg(), 4, exit_date, 11.0, -50.0);
        assert_eq!(trade.exit_total, 50.0);
        assert!((trade.profit_loss - (-950.0)).abs() < 1e-10);
    }
}
