//! Serializable analysis configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! reproduces the stock run: QQQ from 1990-01-01 against the library's
//! five-factor file.

use chrono::NaiveDate;
use factorlab_core::data::FF5_URL;
use factorlab_core::domain::ReturnMethod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::report::ReportFormat;

pub const DEFAULT_TICKER: &str = "QQQ";
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parameters for one factor regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fund ticker as quoted by the price source.
    pub ticker: String,

    /// First month of price history requested.
    pub start_date: NaiveDate,

    /// Location of the zipped five-factor CSV.
    pub factor_url: String,

    pub return_method: ReturnMethod,

    /// Level below which a p-value counts as significant.
    pub significance: f64,

    pub format: ReportFormat,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_TICKER.to_string(),
            start_date: default_start_date(),
            factor_url: FF5_URL.to_string(),
            return_method: ReturnMethod::default(),
            significance: DEFAULT_SIGNIFICANCE,
            format: ReportFormat::default(),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default()
}

impl AnalysisConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a TOML file or CLI flag could get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.trim().is_empty() {
            return Err(ConfigError::Invalid("ticker must not be empty".into()));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "significance must lie in (0, 1), got {}",
                self.significance
            )));
        }
        let today = chrono::Local::now().date_naive();
        if self.start_date > today {
            return Err(ConfigError::Invalid(format!(
                "start date {} is in the future",
                self.start_date
            )));
        }
        if !(self.factor_url.starts_with("http://") || self.factor_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "factor_url must be an http(s) URL, got '{}'",
                self.factor_url
            )));
        }
        Ok(())
    }
}
