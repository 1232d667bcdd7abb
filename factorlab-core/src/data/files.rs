//! Local file sources for offline runs.

use super::french::extract_csv;
use super::provider::{DataError, FactorSource, PriceSource};
use crate::domain::{Month, PriceBar, PriceHistory};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// One row of a price CSV (`date,open,high,low,close,volume,adj_close`).
#[derive(Debug, Deserialize)]
struct PriceRecord {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    adj_close: f64,
}

/// Monthly prices read from a CSV file.
pub struct CsvPriceFile {
    path: PathBuf,
}

impl CsvPriceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_bars(&self) -> Result<Vec<PriceBar>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::MalformedInput(format!("{}: {e}", self.path.display())))?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<PriceRecord>().enumerate() {
            let r = record.map_err(|e| {
                DataError::MalformedInput(format!("{} row {line}: {e}", self.path.display()))
            })?;
            bars.push(PriceBar {
                month: Month::from_date(r.date),
                date: r.date,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
                adj_close: r.adj_close,
            });
        }
        Ok(bars)
    }
}

impl PriceSource for CsvPriceFile {
    fn name(&self) -> &str {
        "csv_file"
    }

    fn fetch_monthly(&self, ticker: &str, start: NaiveDate) -> Result<PriceHistory, DataError> {
        tracing::info!(path = %self.path.display(), ticker, "reading monthly prices from file");
        let bars = self.read_bars()?;
        if bars.is_empty() {
            return Err(DataError::MalformedInput(format!(
                "{} contains no price rows",
                self.path.display()
            )));
        }
        Ok(PriceHistory::new(ticker, bars).since(start))
    }
}

/// Five-factor file on disk, either the zip as distributed or the extracted CSV.
pub struct FactorFile {
    path: PathBuf,
}

impl FactorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_zip(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    }
}

impl FactorSource for FactorFile {
    fn name(&self) -> &str {
        "factor_file"
    }

    fn fetch_factor_csv(&self) -> Result<String, DataError> {
        tracing::info!(path = %self.path.display(), "reading factor file");
        let bytes = std::fs::read(&self.path)?;
        if self.is_zip() {
            extract_csv(&bytes)
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
