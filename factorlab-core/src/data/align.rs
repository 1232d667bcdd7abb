//! Month-keyed inner join of asset returns and factor rows.
//!
//! Only months present in both inputs survive. The missing-value drop is a
//! separate step so the join size can be checked on its own.

use crate::domain::{FactorRow, FactorTable, JoinedSample, Month, SampleRow};
use std::collections::BTreeMap;

/// One joined month before missing values are removed.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub month: Month,
    pub factor: FactorRow,
    pub asset_return: Option<f64>,
}

impl JoinedRow {
    /// Convert to a regression row, or `None` if any value is missing or non-finite.
    pub fn complete(&self) -> Option<SampleRow> {
        let asset_return = self.asset_return.filter(|v| v.is_finite())?;
        let rf = self.factor.rf.filter(|v| v.is_finite())?;
        let mut factors = [0.0; 5];
        for (slot, value) in factors.iter_mut().zip(self.factor.factors.iter()) {
            *slot = value.filter(|v| v.is_finite())?;
        }
        Some(SampleRow {
            month: self.month,
            factors,
            rf,
            asset_return,
            excess_return: excess_return(asset_return, rf),
        })
    }
}

/// Excess return of an asset over the risk-free rate.
///
/// The factor file quotes RF in percentage points while asset returns are
/// fractions, so RF is divided by 100 first.
pub fn excess_return(asset_return: f64, rf_percent: f64) -> f64 {
    asset_return - rf_percent / 100.0
}

/// Inner join on month, ascending. Months missing from either side are dropped.
pub fn join_series(returns: &[(Month, Option<f64>)], factors: &FactorTable) -> Vec<JoinedRow> {
    let by_month: BTreeMap<Month, Option<f64>> = returns.iter().copied().collect();

    factors
        .rows
        .iter()
        .filter_map(|row| {
            by_month.get(&row.month).map(|asset_return| JoinedRow {
                month: row.month,
                factor: row.clone(),
                asset_return: *asset_return,
            })
        })
        .collect()
}

/// Drop incomplete rows and compute excess returns.
pub fn build_sample(joined: Vec<JoinedRow>) -> JoinedSample {
    let total = joined.len();
    let mut rows: Vec<SampleRow> = joined.iter().filter_map(JoinedRow::complete).collect();
    rows.sort_by_key(|r| r.month);

    if rows.len() < total {
        tracing::debug!(
            joined = total,
            kept = rows.len(),
            "dropped joined rows with missing values"
        );
    }

    JoinedSample {
        rows,
        joined: total,
    }
}
