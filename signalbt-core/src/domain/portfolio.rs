//! Portfolio state — the per-date result of simulating a signal series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::SimulationConfig;

/// Portfolio state at a single date.
///
/// The accounting identity `total == holdings + cash` holds at every record,
/// and the running sum of `entry_exit_position` equals `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub buy_signal: u8,
    /// Shares held: `share_count * buy_signal`.
    pub position: i64,
    /// +1 on flat→long, -1 on long→flat, 0 otherwise. `None` on the first
    /// record, which has no prior signal to difference against.
    pub entry_exit: Option<i8>,
    /// Change in shares at this date.
    pub entry_exit_position: i64,
    pub holdings: f64,
    pub cash: f64,
    pub total: f64,
    /// `None` on the first record.
    pub daily_return: Option<f64>,
    pub cumulative_return: f64,
}

impl PortfolioRecord {
    pub fn is_entry(&self) -> bool {
        self.entry_exit == Some(1)
    }

    pub fn is_exit(&self) -> bool {
        self.entry_exit == Some(-1)
    }
}

/// Malformed portfolio records supplied from outside the simulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("portfolio state is empty")]
    Empty,

    #[error("record {index} ({date}) does not follow previous date {previous}")]
    NonMonotonicDate {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("record {index} ({date}): cumulative entry/exit deltas {implied} disagree with position {position}")]
    PositionDrift {
        index: usize,
        date: NaiveDate,
        implied: i64,
        position: i64,
    },

    #[error("record {index} ({date}): cumulative entry/exit deltas overflow")]
    PositionOverflow { index: usize, date: NaiveDate },
}

/// Full portfolio state series, aligned one-to-one with the input dates.
///
/// Built once by [`crate::engine::simulate`] and never mutated afterwards.
/// Deserializing goes through [`PortfolioState::from_records`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioState {
    config: SimulationConfig,
    records: Vec<PortfolioRecord>,
}

impl PortfolioState {
    pub(crate) fn from_simulation(config: SimulationConfig, records: Vec<PortfolioRecord>) -> Self {
        Self { config, records }
    }

    /// Rebuild a state from externally held records (e.g. a reloaded export).
    ///
    /// Checks the structural invariants the evaluator depends on.
    pub fn from_records(
        config: SimulationConfig,
        records: Vec<PortfolioRecord>,
    ) -> Result<Self, StateError> {
        if records.is_empty() {
            return Err(StateError::Empty);
        }

        let mut implied = 0_i64;
        for (index, record) in records.iter().enumerate() {
            if index > 0 {
                let previous = records[index - 1].date;
                if record.date <= previous {
                    return Err(StateError::NonMonotonicDate {
                        index,
                        previous,
                        date: record.date,
                    });
                }
            }
            implied = implied.checked_add(record.entry_exit_position).ok_or(
                StateError::PositionOverflow {
                    index,
                    date: record.date,
                },
            )?;
            if implied != record.position {
                return Err(StateError::PositionDrift {
                    index,
                    date: record.date,
                    implied,
                    position: record.position,
                });
            }
        }

        Ok(Self { config, records })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn records(&self) -> &[PortfolioRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.total).collect()
    }

    /// Daily returns with the undefined first entry dropped.
    pub fn defined_returns(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.daily_return).collect()
    }

    /// Final compounded return, 0.0 for an empty state.
    pub fn final_cumulative_return(&self) -> f64 {
        self.records.last().map_or(0.0, |r| r.cumulative_return)
    }
}

#[derive(Deserialize)]
struct RawPortfolioState {
    config: SimulationConfig,
    records: Vec<PortfolioRecord>,
}

impl<'de> Deserialize<'de> for PortfolioState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPortfolioState::deserialize(deserializer)?;
        PortfolioState::from_records(raw.config, raw.records).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, position: i64, delta: i64) -> PortfolioRecord {
        PortfolioRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close: 10.0,
            buy_signal: u8::from(position > 0),
            position,
            entry_exit: if day == 2 { None } else { Some(0) },
            entry_exit_position: delta,
            holdings: 10.0 * position as f64,
            cash: 1_000.0 - 10.0 * position as f64,
            total: 1_000.0,
            daily_return: if day == 2 { None } else { Some(0.0) },
            cumulative_return: 0.0,
        }
    }

    #[test]
    fn from_records_accepts_consistent_records() {
        let state = PortfolioState::from_records(
            SimulationConfig::default(),
            vec![record(2, 0, 0), record(3, 100, 100), record(4, 100, 0)],
        )
        .unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.defined_returns().len(), 2);
    }

    #[test]
    fn from_records_rejects_empty() {
        let err = PortfolioState::from_records(SimulationConfig::default(), vec![]).unwrap_err();
        assert_eq!(err, StateError::Empty);
    }

    #[test]
    fn from_records_rejects_position_drift() {
        let err = PortfolioState::from_records(
            SimulationConfig::default(),
            vec![record(2, 0, 0), record(3, 100, 50)],
        )
        .unwrap_err();
        assert!(matches!(err, StateError::PositionDrift { index: 1, implied: 50, .. }));
    }

    #[test]
    fn from_records_rejects_unordered_dates() {
        let err = PortfolioState::from_records(
            SimulationConfig::default(),
            vec![record(3, 0, 0), record(2, 0, 0)],
        )
        .unwrap_err();
        assert!(matches!(err, StateError::NonMonotonicDate { index: 1, .. }));
    }

    #[test]
    fn from_records_rejects_delta_overflow() {
        let err = PortfolioState::from_records(
            SimulationConfig::default(),
            vec![record(2, i64::MAX, i64::MAX), record(3, 0, 1)],
        )
        .unwrap_err();
        assert!(matches!(err, StateError::PositionOverflow { index: 1, .. }));
    }

    #[test]
    fn deserialize_validates_records() {
        let good = PortfolioState::from_records(
            SimulationConfig::default(),
            vec![record(2, 0, 0), record(3, 100, 100)],
        )
        .unwrap();
        let json = serde_json::to_string(&good).unwrap();
        let back: PortfolioState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, good);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["records"][1]["entry_exit_position"] = serde_json::json!(0);
        let err = serde_json::from_value::<PortfolioState>(value).unwrap_err();
        assert!(err.to_string().contains("disagree with position"));

        let mut empty: serde_json::Value = serde_json::from_str(&json).unwrap();
        empty["records"] = serde_json::json!([]);
        assert!(serde_json::from_value::<PortfolioState>(empty).is_err());
    }
}
