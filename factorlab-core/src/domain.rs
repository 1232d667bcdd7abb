//! Domain types shared by the data layer, the model, and the runner.
//!
//! Everything is keyed by [`Month`], a timezone-free calendar month. Price
//! bars from Yahoo carry exchange-local timestamps and factor rows carry
//! `YYYYMM` labels; both collapse to the same key before joining.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the five Fama-French factors, in design-matrix order.
pub const FACTOR_NAMES: [&str; 5] = ["Mkt-RF", "SMB", "HML", "RMW", "CMA"];

/// Name of the risk-free rate column in the factor file.
pub const RISK_FREE_NAME: &str = "RF";

// ── Month key ────────────────────────────────────────────────────────

/// A calendar month with no time or timezone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Build a month key. Returns `None` if `month` is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse the Ken French `YYYYMM` date label. Exactly six ASCII digits.
    pub fn parse_yyyymm(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.len() != 6 || !label.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = label[..4].parse().ok()?;
        let month: u32 = label[4..].parse().ok()?;
        Self::new(year, month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Month is validated on construction, so day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ── Return method ────────────────────────────────────────────────────

/// How a period return is derived from two consecutive closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMethod {
    /// `close_t / close_{t-1} - 1`, the same compounding convention as the factor file.
    #[default]
    Simple,
    /// `ln(close_t / close_{t-1})`.
    Log,
}

impl fmt::Display for ReturnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnMethod::Simple => write!(f, "simple"),
            ReturnMethod::Log => write!(f, "log"),
        }
    }
}

impl FromStr for ReturnMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" | "pct" | "pct_change" => Ok(ReturnMethod::Simple),
            "log" => Ok(ReturnMethod::Log),
            other => Err(format!("unknown return method '{other}' (expected simple or log)")),
        }
    }
}

// ── Price series ─────────────────────────────────────────────────────

/// One monthly OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub month: Month,
    /// Exchange-local date of the bar, timezone stripped.
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

/// Monthly price history for one ticker: sorted by month, one bar per month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Sort bars by date and keep only the latest bar within each month.
    ///
    /// Yahoo appends the in-progress month as an extra mid-month quote; the
    /// later bar wins so the key stays unique.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.month == bar.month => {
                    tracing::warn!(
                        month = %bar.month,
                        "duplicate price bar in month, keeping the later one"
                    );
                    *last = bar;
                }
                _ => unique.push(bar),
            }
        }
        Self {
            ticker: ticker.into(),
            bars: unique,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn months(&self) -> Vec<Month> {
        self.bars.iter().map(|b| b.month).collect()
    }

    /// Drop bars before `start`'s month.
    pub fn since(self, start: NaiveDate) -> Self {
        let first = Month::from_date(start);
        Self {
            ticker: self.ticker,
            bars: self.bars.into_iter().filter(|b| b.month >= first).collect(),
        }
    }
}

// ── Factor table ─────────────────────────────────────────────────────

/// One monthly row of the five-factor file. Values are in percentage points;
/// `None` marks a cell that did not parse as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    pub month: Month,
    pub factors: [Option<f64>; 5],
    pub rf: Option<f64>,
}

/// Monthly factor rows in file order (ascending month).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorTable {
    pub rows: Vec<FactorRow>,
}

impl FactorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Joined sample ────────────────────────────────────────────────────

/// A fully populated regression row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub month: Month,
    /// Mkt-RF, SMB, HML, RMW, CMA in percentage points.
    pub factors: [f64; 5],
    /// Risk-free rate in percentage points.
    pub rf: f64,
    /// Asset return as a fraction.
    pub asset_return: f64,
    /// `asset_return - rf / 100`.
    pub excess_return: f64,
}

/// The rectangular regression input: inner-joined, incomplete rows removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedSample {
    pub rows: Vec<SampleRow>,
    /// Rows produced by the join before the missing-value drop.
    pub joined: usize,
}

impl JoinedSample {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows removed because some value was missing.
    pub fn dropped(&self) -> usize {
        self.joined.saturating_sub(self.rows.len())
    }

    pub fn first_month(&self) -> Option<Month> {
        self.rows.first().map(|r| r.month)
    }

    pub fn last_month(&self) -> Option<Month> {
        self.rows.last().map(|r| r.month)
    }

    pub fn excess_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.excess_return).collect()
    }

    /// Column `i` of the factor block (0 = Mkt-RF … 4 = CMA).
    pub fn factor_column(&self, i: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.factors[i]).collect()
    }
}
