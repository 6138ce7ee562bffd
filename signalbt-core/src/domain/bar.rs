//! SignalBar — one dated close price with its long/flat signal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closing price and buy signal for a single trading date.
///
/// `buy_signal` is 1 for "be long" and 0 for "be flat". Any other value is a
/// data-contract violation caught by [`SignalSeries::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBar {
    pub date: NaiveDate,
    pub close: f64,
    pub buy_signal: u8,
}

impl SignalBar {
    pub fn new(date: NaiveDate, close: f64, buy_signal: u8) -> Self {
        Self {
            date,
            close,
            buy_signal,
        }
    }
}

/// Data-contract violations on an input series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("signal series is empty")]
    Empty,

    #[error("date at row {index} ({date}) does not follow previous date {previous}")]
    NonMonotonicDate {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("close at row {index} ({date}) must be finite and positive, got {close}")]
    InvalidClose {
        index: usize,
        date: NaiveDate,
        close: f64,
    },

    #[error("buy signal at row {index} ({date}) must be 0 or 1, got {value}")]
    InvalidSignal {
        index: usize,
        date: NaiveDate,
        value: u8,
    },
}

/// A validated, chronologically ordered price/signal series.
///
/// Construction checks every row, so downstream code can rely on a non-empty
/// series with strictly increasing dates, positive closes and binary signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSeries {
    bars: Vec<SignalBar>,
}

impl SignalSeries {
    pub fn new(bars: Vec<SignalBar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }

        for (index, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    index,
                    date: bar.date,
                    close: bar.close,
                });
            }
            if bar.buy_signal > 1 {
                return Err(SeriesError::InvalidSignal {
                    index,
                    date: bar.date,
                    value: bar.buy_signal,
                });
            }
            if index > 0 {
                let previous = bars[index - 1].date;
                if bar.date <= previous {
                    return Err(SeriesError::NonMonotonicDate {
                        index,
                        previous,
                        date: bar.date,
                    });
                }
            }
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[SignalBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }
}

impl<'de> Deserialize<'de> for SignalSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bars = Vec::<SignalBar>::deserialize(deserializer)?;
        SignalSeries::new(bars).map_err(serde::de::Error::custom)
    }
}
