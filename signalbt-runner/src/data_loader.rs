//! Series loading for the runner.
//!
//! - `load_series()`: CSV with a date, close and buy-signal column, validated
//!   into a `SignalSeries`.
//! - `load_factor_table()`: CSV with a date column and any number of numeric
//!   factor columns.
//! - `generate_synthetic_series()`: deterministic random walk with a moving
//!   average signal, for demos and tests.
//!
//! Column names, delimiter and decimal separator are configurable. Dates are
//! accepted as `%Y-%m-%d`, `%Y/%m/%d` or `%d/%m/%Y`.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use signalbt_core::domain::{SeriesError, SignalBar, SignalSeries};
use thiserror::Error;

use crate::factors::{FactorError, FactorTable};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("row {row}: cannot parse {column} value {value:?}")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("invalid factor table: {0}")]
    Factors(#[from] FactorError),
}

/// Options controlling how CSV input is read.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub date_column: String,
    pub close_column: String,
    pub signal_column: String,
    pub delimiter: u8,
    /// Normalize `1.234,56`-style numbers before parsing.
    pub decimal_comma: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            date_column: "date".into(),
            close_column: "close".into(),
            signal_column: "buy_signal".into(),
            delimiter: b',',
            decimal_comma: false,
        }
    }
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn reader<R: Read>(input: R, opts: &LoadOptions) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| LoadError::MissingColumn {
            column: column.to_string(),
        })
}

// ─── Series ─────────────────────────────────────────────────────────

/// Load and validate a signal series from a CSV file.
pub fn load_series(path: &Path, opts: &LoadOptions) -> Result<SignalSeries, LoadError> {
    let series = load_series_from_reader(open(path)?, opts)?;
    log::debug!(
        "loaded {} rows from {} ({} to {})",
        series.len(),
        path.display(),
        series.first_date(),
        series.last_date()
    );
    Ok(series)
}

/// Load and validate a signal series from any CSV source.
pub fn load_series_from_reader<R: Read>(
    input: R,
    opts: &LoadOptions,
) -> Result<SignalSeries, LoadError> {
    let mut rdr = reader(input, opts);
    let headers = rdr.headers()?.clone();
    let date_idx = column_index(&headers, &opts.date_column)?;
    let close_idx = column_index(&headers, &opts.close_column)?;
    let signal_idx = column_index(&headers, &opts.signal_column)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let date = parse_date(field(date_idx)).ok_or_else(|| LoadError::InvalidField {
            row,
            column: opts.date_column.clone(),
            value: field(date_idx).to_string(),
        })?;
        let close = parse_number(field(close_idx), opts.decimal_comma).ok_or_else(|| {
            LoadError::InvalidField {
                row,
                column: opts.close_column.clone(),
                value: field(close_idx).to_string(),
            }
        })?;
        let signal = parse_signal(field(signal_idx), opts.decimal_comma).ok_or_else(|| {
            LoadError::InvalidField {
                row,
                column: opts.signal_column.clone(),
                value: field(signal_idx).to_string(),
            }
        })?;

        bars.push(SignalBar::new(date, close, signal));
    }

    Ok(SignalSeries::new(bars)?)
}

// ─── Factors ────────────────────────────────────────────────────────

/// Load a factor table: the date column plus every other column as a factor.
///
/// Empty or unparsable factor cells become NaN; the join drops those rows.
pub fn load_factor_table(path: &Path, opts: &LoadOptions) -> Result<FactorTable, LoadError> {
    let mut rdr = reader(open(path)?, opts);
    let headers = rdr.headers()?.clone();
    let date_idx = column_index(&headers, &opts.date_column)?;
    let factor_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != date_idx).collect();
    let names = factor_idx
        .iter()
        .map(|&i| headers.get(i).unwrap_or("").to_string())
        .collect();

    let mut table = FactorTable::new(names)?;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidField {
            row: i + 1,
            column: opts.date_column.clone(),
            value: raw_date.to_string(),
        })?;
        let values = factor_idx
            .iter()
            .map(|&idx| {
                record
                    .get(idx)
                    .and_then(|v| parse_number(v, opts.decimal_comma))
                    .unwrap_or(f64::NAN)
            })
            .collect();
        table.insert(date, values)?;
    }

    log::debug!(
        "loaded {} factor rows ({} columns) from {}",
        table.len(),
        table.names().len(),
        path.display()
    );
    Ok(table)
}

// ─── Field parsing ──────────────────────────────────────────────────

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_number(raw: &str, decimal_comma: bool) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    if decimal_comma {
        raw.replace('.', "").replace(',', ".").parse().ok()
    } else {
        raw.parse().ok()
    }
}

/// Integral values only; range checks belong to the series contract.
fn parse_signal(raw: &str, decimal_comma: bool) -> Option<u8> {
    if let Ok(v) = raw.parse::<u8>() {
        return Some(v);
    }
    let v = parse_number(raw, decimal_comma)?;
    if v.fract() == 0.0 && (0.0..=255.0).contains(&v) {
        Some(v as u8)
    } else {
        None
    }
}

// ─── Synthetic data ─────────────────────────────────────────────────

/// Parameters for a synthetic series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticOptions {
    pub start: NaiveDate,
    /// Number of trading days (weekends are skipped).
    pub days: usize,
    pub seed: u64,
    /// Lookback of the moving average that drives the signal.
    pub ma_window: usize,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days: 504,
            seed: 42,
            ma_window: 20,
        }
    }
}

/// Generate a deterministic random-walk series.
///
/// Closes start at 100.0 and move by a uniform daily return in ±2%. The
/// signal is long while the close sits above its trailing moving average.
pub fn generate_synthetic_series(opts: &SyntheticOptions) -> Result<SignalSeries, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let window = opts.ma_window.max(1);

    let mut bars = Vec::with_capacity(opts.days);
    let mut closes: Vec<f64> = Vec::with_capacity(opts.days);
    let mut price = 100.0_f64;
    let mut current = opts.start;

    while bars.len() < opts.days {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.02..0.02);
        price *= 1.0 + daily_return;
        closes.push(price);

        let lookback = &closes[closes.len().saturating_sub(window)..];
        let average = lookback.iter().sum::<f64>() / lookback.len() as f64;
        let signal = u8::from(closes.len() >= window && price > average);

        bars.push(SignalBar::new(current, price, signal));
        current += chrono::Duration::days(1);
    }

    Ok(SignalSeries::new(bars)?)
}
