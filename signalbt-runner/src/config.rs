//! TOML run configuration.
//!
//! A run file may carry three tables, all optional:
//!
//! ```toml
//! [simulation]
//! initial_capital = 100000.0
//! share_count = 2000
//!
//! [data]
//! date_column = "date"
//! close_column = "close"
//! signal_column = "buy_signal"
//! delimiter = ","
//! decimal_comma = false
//!
//! [factors]
//! split_rate = 0.8
//! ```
//!
//! Missing tables and keys take their defaults. Command-line flags override
//! values read from the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use signalbt_core::engine::{ConfigError as SimulationConfigError, SimulationConfig};
use thiserror::Error;

use crate::data_loader::LoadOptions;
use crate::factors::DEFAULT_SPLIT_RATE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid simulation parameters: {0}")]
    Simulation(#[from] SimulationConfigError),

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(String),

    #[error("factor split rate must lie strictly between 0 and 1, got {0}")]
    InvalidSplitRate(f64),
}

/// Input file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub date_column: String,
    pub close_column: String,
    pub signal_column: String,
    pub delimiter: String,
    /// Treat `,` as the decimal separator in numeric fields.
    pub decimal_comma: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        let opts = LoadOptions::default();
        Self {
            date_column: opts.date_column,
            close_column: opts.close_column,
            signal_column: opts.signal_column,
            delimiter: (opts.delimiter as char).to_string(),
            decimal_comma: opts.decimal_comma,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    pub split_rate: f64,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            split_rate: DEFAULT_SPLIT_RATE,
        }
    }
}

/// Everything needed to reproduce a run besides the input files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub data: DataConfig,
    pub factors: FactorConfig,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.load_options()?;
        let rate = self.factors.split_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(ConfigError::InvalidSplitRate(rate));
        }
        Ok(())
    }

    /// CSV loader options described by the `[data]` table.
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        let delimiter = match self.data.delimiter.as_bytes() {
            [b] if b.is_ascii() => *b,
            _ => return Err(ConfigError::InvalidDelimiter(self.data.delimiter.clone())),
        };
        Ok(LoadOptions {
            date_column: self.data.date_column.clone(),
            close_column: self.data.close_column.clone(),
            signal_column: self.data.signal_column.clone(),
            delimiter,
            decimal_comma: self.data.decimal_comma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.simulation.initial_capital, 100_000.0);
        assert_eq!(config.simulation.share_count, 2_000);
        assert_eq!(config.factors.split_rate, 0.8);
    }

    #[test]
    fn partial_tables_fill_defaults() {
        let config = RunConfig::from_toml(
            r#"
            [simulation]
            share_count = 50

            [data]
            delimiter = ";"
            decimal_comma = true
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.share_count, 50);
        assert_eq!(config.simulation.initial_capital, 100_000.0);

        let opts = config.load_options().unwrap();
        assert_eq!(opts.delimiter, b';');
        assert!(opts.decimal_comma);
        assert_eq!(opts.close_column, "close");
    }

    #[test]
    fn rejects_invalid_simulation() {
        let err = RunConfig::from_toml("[simulation]\ninitial_capital = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Simulation(_)));
    }

    #[test]
    fn rejects_multi_char_delimiter() {
        let err = RunConfig::from_toml("[data]\ndelimiter = \"::\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelimiter(_)));
    }

    #[test]
    fn rejects_bad_split_rate() {
        let err = RunConfig::from_toml("[factors]\nsplit_rate = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSplitRate(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            RunConfig::from_toml("[simulation"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "[simulation]\ninitial_capital = 5000.0\n").unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.simulation.initial_capital, 5_000.0);
    }
}
