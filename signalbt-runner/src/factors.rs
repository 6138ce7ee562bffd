//! Factor-model-ready return series.
//!
//! The strategy's daily returns are joined on date with a table of external
//! factor columns (market excess return, size, value, ...) and split
//! chronologically into train and test sets for a downstream regression.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use signalbt_core::data::{dated_frame, write_parquet, FrameError};
use signalbt_core::domain::PortfolioState;
use thiserror::Error;

/// Default share of rows assigned to the training set.
pub const DEFAULT_SPLIT_RATE: f64 = 0.8;

/// Column name of the strategy's daily return in exported frames.
pub const RETURN_COLUMN: &str = "portfolio_daily_returns";

/// Column name of the underlying close in exported frames.
pub const CLOSE_COLUMN: &str = "close";

#[derive(Debug, Error)]
pub enum FactorError {
    #[error("factor table must have at least one column")]
    NoColumns,

    #[error("duplicate factor column '{0}'")]
    DuplicateColumn(String),

    #[error("row for {date} has {actual} factor values, expected {expected}")]
    WidthMismatch {
        date: NaiveDate,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate factor row for {0}")]
    DuplicateDate(NaiveDate),

    #[error("split rate must lie strictly between 0 and 1, got {0}")]
    InvalidSplitRate(f64),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

// ─── Return series ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub daily_return: f64,
    pub close: f64,
}

/// Dated daily returns of a simulated portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Every record with a defined daily return (all but the first).
    pub fn from_state(state: &PortfolioState) -> Self {
        let points = state
            .records()
            .iter()
            .filter_map(|r| {
                r.daily_return.map(|daily_return| ReturnPoint {
                    date: r.date,
                    daily_return,
                    close: r.close,
                })
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inner join on date. Rows where the return or any factor is
    /// non-finite are dropped.
    pub fn join_factors(&self, factors: &FactorTable) -> FactorDataset {
        let rows: Vec<FactorRow> = self
            .points
            .iter()
            .filter(|p| p.daily_return.is_finite())
            .filter_map(|p| {
                let values = factors.rows.get(&p.date)?;
                if values.iter().any(|v| !v.is_finite()) {
                    return None;
                }
                Some(FactorRow {
                    date: p.date,
                    daily_return: p.daily_return,
                    close: p.close,
                    factors: values.clone(),
                })
            })
            .collect();

        log::debug!(
            "joined {} of {} return rows with {} factor dates",
            rows.len(),
            self.points.len(),
            factors.len()
        );

        FactorDataset {
            names: factors.names.clone(),
            rows,
        }
    }

    /// Columns: date, portfolio_daily_returns, close.
    pub fn to_frame(&self) -> Result<DataFrame, FactorError> {
        let dates: Vec<NaiveDate> = self.points.iter().map(|p| p.date).collect();
        let returns: Vec<f64> = self.points.iter().map(|p| p.daily_return).collect();
        let closes: Vec<f64> = self.points.iter().map(|p| p.close).collect();
        Ok(dated_frame(
            &dates,
            &[(RETURN_COLUMN, returns.as_slice()), (CLOSE_COLUMN, closes.as_slice())],
        )?)
    }
}

// ─── Factor table ───────────────────────────────────────────────────

/// External factor values keyed by date.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    names: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<f64>>,
}

impl FactorTable {
    pub fn new(names: Vec<String>) -> Result<Self, FactorError> {
        if names.is_empty() {
            return Err(FactorError::NoColumns);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) || name == RETURN_COLUMN || name == CLOSE_COLUMN || name == "date" {
                return Err(FactorError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            names,
            rows: BTreeMap::new(),
        })
    }

    pub fn insert(&mut self, date: NaiveDate, values: Vec<f64>) -> Result<(), FactorError> {
        if values.len() != self.names.len() {
            return Err(FactorError::WidthMismatch {
                date,
                expected: self.names.len(),
                actual: values.len(),
            });
        }
        if self.rows.contains_key(&date) {
            return Err(FactorError::DuplicateDate(date));
        }
        self.rows.insert(date, values);
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, date: NaiveDate) -> Option<&[f64]> {
        self.rows.get(&date).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ─── Joined dataset ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    pub date: NaiveDate,
    pub daily_return: f64,
    pub close: f64,
    pub factors: Vec<f64>,
}

/// Strategy returns aligned with factor values, in date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDataset {
    pub names: Vec<String>,
    pub rows: Vec<FactorRow>,
}

impl FactorDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Chronological split: the first `floor(rate * len)` rows train, the
    /// rest test. No shuffling.
    pub fn split(&self, rate: f64) -> Result<(FactorDataset, FactorDataset), FactorError> {
        if !(rate > 0.0 && rate < 1.0) {
            return Err(FactorError::InvalidSplitRate(rate));
        }
        let cut = (rate * self.rows.len() as f64).floor() as usize;
        let (train, test) = self.rows.split_at(cut);
        Ok((
            FactorDataset {
                names: self.names.clone(),
                rows: train.to_vec(),
            },
            FactorDataset {
                names: self.names.clone(),
                rows: test.to_vec(),
            },
        ))
    }

    /// Columns: date, portfolio_daily_returns, close, then one column per
    /// factor.
    pub fn to_frame(&self) -> Result<DataFrame, FactorError> {
        let dates: Vec<NaiveDate> = self.rows.iter().map(|r| r.date).collect();
        let returns: Vec<f64> = self.rows.iter().map(|r| r.daily_return).collect();
        let closes: Vec<f64> = self.rows.iter().map(|r| r.close).collect();
        let factor_columns: Vec<Vec<f64>> = (0..self.names.len())
            .map(|i| self.rows.iter().map(|r| r.factors[i]).collect())
            .collect();

        let mut columns: Vec<(&str, &[f64])> = vec![
            (RETURN_COLUMN, returns.as_slice()),
            (CLOSE_COLUMN, closes.as_slice()),
        ];
        for (name, values) in self.names.iter().zip(&factor_columns) {
            columns.push((name.as_str(), values.as_slice()));
        }
        Ok(dated_frame(&dates, &columns)?)
    }

    pub fn write_parquet(&self, path: &Path) -> Result<(), FactorError> {
        write_parquet(&self.to_frame()?, path)?;
        Ok(())
    }
}
