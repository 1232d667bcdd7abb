//! Period returns from consecutive monthly closes.

use crate::domain::{Month, PriceHistory, ReturnMethod};

/// Period returns aligned with `closes`.
///
/// The output has the same length as the input; the first entry is always
/// `None` because it has no prior period, so `N` closes yield `N - 1` usable
/// values. A period whose previous or current close is non-positive or
/// non-finite is also `None`.
pub fn compute_returns(closes: &[f64], method: ReturnMethod) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(None);

    for pair in closes.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let valid = prev.is_finite() && cur.is_finite() && prev > 0.0 && cur > 0.0;
        out.push(valid.then(|| match method {
            ReturnMethod::Simple => cur / prev - 1.0,
            ReturnMethod::Log => (cur / prev).ln(),
        }));
    }

    out
}

/// Month-keyed returns for a price history.
pub fn period_returns(history: &PriceHistory, method: ReturnMethod) -> Vec<(Month, Option<f64>)> {
    history
        .months()
        .into_iter()
        .zip(compute_returns(&history.closes(), method))
        .collect()
}
