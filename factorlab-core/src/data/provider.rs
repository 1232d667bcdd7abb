//! Source traits and structured error types.
//!
//! `PriceSource` and `FactorSource` abstract over where the two inputs come
//! from (live HTTP, local files, frozen snapshots) so the pipeline can be
//! pointed at fixtures in tests.

use crate::domain::PriceHistory;
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for data acquisition and cleaning.
///
/// Every variant is fatal to a run; nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provides monthly price history for a ticker.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch monthly bars for `ticker` from `start`'s month up to the latest available month.
    fn fetch_monthly(&self, ticker: &str, start: NaiveDate) -> Result<PriceHistory, DataError>;
}

/// Provides the raw text of the five-factor CSV file.
///
/// Sources hand back text rather than a parsed table so the cleaning stage
/// owns all format checks and snapshots can freeze exactly what was fetched.
pub trait FactorSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn fetch_factor_csv(&self) -> Result<String, DataError>;
}
