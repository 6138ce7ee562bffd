//! Tabular views of portfolio state backed by Polars.
//!
//! Undefined values (first-row entry/exit flag and daily return) become
//! nulls rather than NaN so downstream tools see them as missing.

use crate::domain::PortfolioState;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("column '{name}' has {actual} values, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("polars error: {0}")]
    Polars(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PolarsError> for FrameError {
    fn from(e: PolarsError) -> Self {
        FrameError::Polars(e.to_string())
    }
}

fn date_column(dates: &[NaiveDate]) -> Result<Column, FrameError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    Ok(Column::new("date".into(), days).cast(&DataType::Date)?)
}

/// Full portfolio state as a DataFrame, one row per date.
pub fn portfolio_frame(state: &PortfolioState) -> Result<DataFrame, FrameError> {
    let records = state.records();
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();

    let close: Vec<f64> = records.iter().map(|r| r.close).collect();
    let signal: Vec<i32> = records.iter().map(|r| i32::from(r.buy_signal)).collect();
    let position: Vec<i64> = records.iter().map(|r| r.position).collect();
    let entry_exit: Vec<Option<i32>> = records
        .iter()
        .map(|r| r.entry_exit.map(i32::from))
        .collect();
    let delta: Vec<i64> = records.iter().map(|r| r.entry_exit_position).collect();
    let holdings: Vec<f64> = records.iter().map(|r| r.holdings).collect();
    let cash: Vec<f64> = records.iter().map(|r| r.cash).collect();
    let total: Vec<f64> = records.iter().map(|r| r.total).collect();
    let daily: Vec<Option<f64>> = records.iter().map(|r| r.daily_return).collect();
    let cumulative: Vec<f64> = records.iter().map(|r| r.cumulative_return).collect();

    Ok(DataFrame::new(vec![
        date_column(&dates)?,
        Column::new("close".into(), close),
        Column::new("buy_signal".into(), signal),
        Column::new("position".into(), position),
        Column::new("entry_exit".into(), entry_exit),
        Column::new("entry_exit_position".into(), delta),
        Column::new("portfolio_holdings".into(), holdings),
        Column::new("portfolio_cash".into(), cash),
        Column::new("portfolio_total".into(), total),
        Column::new("portfolio_daily_returns".into(), daily),
        Column::new("portfolio_cumulative_returns".into(), cumulative),
    ])?)
}

/// A dated frame of named float columns (returns, factors, ...).
pub fn dated_frame(
    dates: &[NaiveDate],
    columns: &[(&str, &[f64])],
) -> Result<DataFrame, FrameError> {
    let mut out = Vec::with_capacity(columns.len() + 1);
    out.push(date_column(dates)?);
    for (name, values) in columns {
        if values.len() != dates.len() {
            return Err(FrameError::LengthMismatch {
                name: (*name).to_string(),
                expected: dates.len(),
                actual: values.len(),
            });
        }
        out.push(Column::new((*name).into(), values.to_vec()));
    }
    Ok(DataFrame::new(out)?)
}

/// Write a DataFrame to a Parquet file, via a temp file and rename.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), FrameError> {
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path)?;
    let written = ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(FrameError::from)
        .and_then(|_| fs::rename(&tmp_path, path).map_err(FrameError::Io));
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

/// Read a Parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<DataFrame, FrameError> {
    let file = fs::File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
