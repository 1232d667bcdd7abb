//! Frozen input snapshots.
//!
//! Layout: `{dir}/prices.parquet`, `{dir}/factors.csv`, `{dir}/meta.json`.
//!
//! A snapshot freezes exactly what the two live sources returned, so a
//! later run can repeat the analysis offline and get identical numbers.
//! Writes are atomic (write to .tmp, rename into place). Reads verify the
//! BLAKE3 hashes recorded in the metadata sidecar.

use super::provider::{DataError, FactorSource, PriceSource};
use crate::domain::{Month, PriceBar, PriceHistory};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PRICES_FILE: &str = "prices.parquet";
const FACTORS_FILE: &str = "factors.csv";
const META_FILE: &str = "meta.json";

/// Metadata sidecar for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub ticker: String,
    pub first_month: Month,
    pub last_month: Month,
    pub bar_count: usize,
    pub prices_hash: String,
    pub factors_hash: String,
    pub saved_at: chrono::NaiveDateTime,
}

/// A directory holding one run's frozen inputs.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write prices and raw factor text, replacing any previous snapshot in the directory.
    pub fn save(&self, prices: &PriceHistory, factor_csv: &str) -> Result<SnapshotMeta, DataError> {
        let (first, last) = match (prices.bars().first(), prices.bars().last()) {
            (Some(first), Some(last)) => (first.month, last.month),
            _ => return Err(DataError::Snapshot("no price bars to snapshot".into())),
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::Snapshot(format!("failed to create dir: {e}")))?;

        let meta = SnapshotMeta {
            ticker: prices.ticker.clone(),
            first_month: first,
            last_month: last,
            bar_count: prices.len(),
            prices_hash: hash_bars(prices.bars())?,
            factors_hash: blake3::hash(factor_csv.as_bytes()).to_hex().to_string(),
            saved_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Snapshot(format!("meta serialization: {e}")))?;

        // Stage all three files before replacing any of them
        let prices_path = self.dir.join(PRICES_FILE);
        let prices_tmp = prices_path.with_extension("parquet.tmp");
        write_parquet(&bars_to_dataframe(prices.bars())?, &prices_tmp)?;

        let factors_path = self.dir.join(FACTORS_FILE);
        let factors_tmp = factors_path.with_extension("csv.tmp");
        fs::write(&factors_tmp, factor_csv)
            .map_err(|e| DataError::Snapshot(format!("factor write: {e}")))?;

        let meta_path = self.dir.join(META_FILE);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::Snapshot(format!("meta write: {e}")))?;

        rename_into_place(&prices_tmp, &prices_path)?;
        rename_into_place(&factors_tmp, &factors_path)?;
        rename_into_place(&meta_tmp, &meta_path)?;

        tracing::info!(
            dir = %self.dir.display(),
            ticker = %meta.ticker,
            bars = meta.bar_count,
            "saved input snapshot"
        );
        Ok(meta)
    }

    /// Read the metadata sidecar.
    pub fn meta(&self) -> Result<SnapshotMeta, DataError> {
        let path = self.dir.join(META_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            DataError::Snapshot(format!("no snapshot metadata at {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| DataError::Snapshot(format!("corrupt snapshot metadata: {e}")))
    }

    /// Load the frozen price history, verifying its hash.
    pub fn load_prices(&self) -> Result<PriceHistory, DataError> {
        let meta = self.meta()?;
        let bars = load_and_validate_parquet(&self.dir.join(PRICES_FILE))?;
        let hash = hash_bars(&bars)?;
        if hash != meta.prices_hash {
            return Err(DataError::Snapshot(format!(
                "price data hash mismatch (expected {}, found {hash})",
                meta.prices_hash
            )));
        }
        Ok(PriceHistory::new(meta.ticker, bars))
    }

    /// Load the frozen factor text, verifying its hash.
    pub fn load_factor_csv(&self) -> Result<String, DataError> {
        let meta = self.meta()?;
        let text = fs::read_to_string(self.dir.join(FACTORS_FILE))
            .map_err(|e| DataError::Snapshot(format!("factor read: {e}")))?;
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        if hash != meta.factors_hash {
            return Err(DataError::Snapshot(format!(
                "factor data hash mismatch (expected {}, found {hash})",
                meta.factors_hash
            )));
        }
        Ok(text)
    }
}

impl PriceSource for SnapshotStore {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn fetch_monthly(&self, ticker: &str, start: NaiveDate) -> Result<PriceHistory, DataError> {
        let history = self.load_prices()?;
        if !history.ticker.eq_ignore_ascii_case(ticker) {
            return Err(DataError::Snapshot(format!(
                "snapshot holds '{}', not '{ticker}'",
                history.ticker
            )));
        }
        Ok(history.since(start))
    }
}

impl FactorSource for SnapshotStore {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn fetch_factor_csv(&self) -> Result<String, DataError> {
        self.load_factor_csv()
    }
}

fn hash_bars(bars: &[PriceBar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::Snapshot(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), DataError> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        DataError::Snapshot(format!("atomic rename failed: {e}"))
    })
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Convert price bars to a Polars DataFrame.
fn bars_to_dataframe(bars: &[PriceBar]) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Snapshot(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("adj_close".into(), adj_closes),
    ])
    .map_err(|e| DataError::Snapshot(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::Snapshot(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::Snapshot(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load the prices Parquet file and check its shape.
fn load_and_validate_parquet(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = fs::File::open(path)
        .map_err(|e| DataError::Snapshot(format!("open {}: {e}", path.display())))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Snapshot(format!("read parquet: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::Snapshot("empty prices file".into()));
    }

    for col_name in ["date", "open", "high", "low", "close", "volume", "adj_close"] {
        if df.column(col_name).is_err() {
            return Err(DataError::Snapshot(format!("missing column '{col_name}'")));
        }
    }

    dataframe_to_bars(&df)
}

/// Convert a DataFrame back to price bars.
fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::Snapshot(format!("column read: {e}")))
    };
    let f64_col = |name: &str| -> Result<Vec<f64>, DataError> {
        let ca = col(name)?
            .f64()
            .map_err(|e| DataError::Snapshot(format!("{name} column type: {e}")))?;
        Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    };

    let date_ca = col("date")?
        .date()
        .map_err(|e| DataError::Snapshot(format!("date column type: {e}")))?;
    let vol_ca = col("volume")?
        .u64()
        .map_err(|e| DataError::Snapshot(format!("volume column type: {e}")))?;
    let opens = f64_col("open")?;
    let highs = f64_col("high")?;
    let lows = f64_col("low")?;
    let closes = f64_col("close")?;
    let adj_closes = f64_col("adj_close")?;

    let epoch = epoch();
    let mut bars = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| DataError::Snapshot(format!("null date at row {i}")))?;
        let date = epoch + chrono::Duration::days(date_days as i64);

        bars.push(PriceBar {
            month: Month::from_date(date),
            date,
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: vol_ca.get(i).unwrap_or(0),
            adj_close: adj_closes[i],
        });
    }

    Ok(bars)
}
