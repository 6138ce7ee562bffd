//! Simulation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_SHARE_COUNT: u64 = 2_000;

/// Invalid simulation parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial capital must be finite and positive, got {0}")]
    InvalidInitialCapital(f64),

    #[error("share count must be positive")]
    ZeroShareCount,

    #[error("share count {0} exceeds the supported position size")]
    ShareCountTooLarge(u64),
}

/// Parameters of a single simulation run.
///
/// Passed explicitly into [`super::simulate`]; there is no global default
/// state, so several configurations can be evaluated side by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting cash.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Fixed number of shares bought on entry and sold on exit.
    #[serde(default = "default_share_count")]
    pub share_count: u64,
}

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

fn default_share_count() -> u64 {
    DEFAULT_SHARE_COUNT
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            share_count: DEFAULT_SHARE_COUNT,
        }
    }
}

impl SimulationConfig {
    pub fn new(initial_capital: f64, share_count: u64) -> Result<Self, ConfigError> {
        let config = Self {
            initial_capital,
            share_count,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidInitialCapital(self.initial_capital));
        }
        if self.share_count == 0 {
            return Err(ConfigError::ZeroShareCount);
        }
        if i64::try_from(self.share_count).is_err() {
            return Err(ConfigError::ShareCountTooLarge(self.share_count));
        }
        Ok(())
    }

    /// Share count as a signed position size. Only valid after `validate`.
    pub(crate) fn shares(&self) -> i64 {
        self.share_count as i64
    }
}
