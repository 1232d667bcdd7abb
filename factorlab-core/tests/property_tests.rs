//! Property tests for the cleaning invariants.
//!
//! Uses proptest to verify:
//! 1. Return count: N closes give N entries with N - 1 usable returns
//! 2. Truncation: parsing stops exactly at the annual marker
//! 3. Join size: the inner join has one row per overlapping month
//! 4. Excess return: RF is scaled from percent before subtraction
//! 5. Recovery: a noise-free five-factor series is fitted exactly

use chrono::NaiveDate;
use factorlab_core::data::{
    build_sample, compute_returns, excess_return, join_series, parse_factor_table,
};
use factorlab_core::domain::{
    FactorRow, FactorTable, JoinedSample, Month, ReturnMethod, SampleRow,
};
use factorlab_core::model::fit_factor_model;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_close() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn month_at(offset: u32) -> Month {
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    Month::from_date(base + chrono::Months::new(offset))
}

fn factor_row(month: Month) -> FactorRow {
    FactorRow {
        month,
        factors: [Some(1.0), Some(0.5), Some(-0.5), Some(0.2), Some(-0.1)],
        rf: Some(0.1),
    }
}

fn factor_text(monthly_rows: usize) -> String {
    let mut s = String::from("preamble one\npreamble two\n\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
    for i in 0..monthly_rows {
        let m = month_at(i as u32);
        s.push_str(&format!(
            "{}{:02},1.0,0.5,-0.5,0.2,-0.1,0.1\n",
            m.year(),
            m.month()
        ));
    }
    s.push_str("\n Annual Factors: January-December \n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
    s.push_str("  2000,10.0,5.0,-5.0,2.0,-1.0,1.2\n");
    s
}

// ── 1. Return count ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn returns_keep_length_and_lose_one(closes in prop::collection::vec(arb_close(), 1..120)) {
        for method in [ReturnMethod::Simple, ReturnMethod::Log] {
            let returns = compute_returns(&closes, method);
            prop_assert_eq!(returns.len(), closes.len());
            prop_assert!(returns[0].is_none());
            prop_assert_eq!(returns.iter().filter(|r| r.is_some()).count(), closes.len() - 1);
        }
    }

    /// Compounding simple returns reproduces the last close.
    #[test]
    fn simple_returns_compound_to_price_ratio(closes in prop::collection::vec(arb_close(), 2..60)) {
        let returns = compute_returns(&closes, ReturnMethod::Simple);
        let growth: f64 = returns.iter().flatten().map(|r| 1.0 + r).product();
        let ratio = closes[closes.len() - 1] / closes[0];
        prop_assert!((growth - ratio).abs() < 1e-9 * ratio.max(1.0));
    }
}

// ── 2. Truncation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn parsing_stops_at_marker(monthly_rows in 0usize..80) {
        let table = parse_factor_table(&factor_text(monthly_rows)).unwrap();
        prop_assert_eq!(table.len(), monthly_rows);
        if monthly_rows > 0 {
            prop_assert_eq!(table.rows[monthly_rows - 1].month, month_at(monthly_rows as u32 - 1));
        }
    }
}

// ── 3. Join size ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn join_has_one_row_per_overlapping_month(
        price_start in 0u32..40,
        price_len in 0u32..60,
        factor_start in 0u32..40,
        factor_len in 0u32..60,
    ) {
        let returns: Vec<(Month, Option<f64>)> = (price_start..price_start + price_len)
            .map(|i| (month_at(i), Some(0.01)))
            .collect();
        let table = FactorTable {
            rows: (factor_start..factor_start + factor_len)
                .map(|i| factor_row(month_at(i)))
                .collect(),
        };

        let lo = price_start.max(factor_start);
        let hi = (price_start + price_len).min(factor_start + factor_len);
        let overlap = hi.saturating_sub(lo) as usize;

        let joined = join_series(&returns, &table);
        prop_assert_eq!(joined.len(), overlap);
        for pair in joined.windows(2) {
            prop_assert!(pair[0].month < pair[1].month);
        }

        let sample = build_sample(joined);
        prop_assert_eq!(sample.len(), overlap);
        prop_assert_eq!(sample.dropped(), 0);
    }

    /// Any missing cell removes exactly that month.
    #[test]
    fn missing_cells_drop_their_rows(holes in prop::collection::btree_set(0u32..24, 0..10)) {
        let returns: Vec<(Month, Option<f64>)> = (0..24)
            .map(|i| (month_at(i), (!holes.contains(&i)).then_some(0.01)))
            .collect();
        let table = FactorTable { rows: (0..24).map(|i| factor_row(month_at(i))).collect() };

        let sample = build_sample(join_series(&returns, &table));
        prop_assert_eq!(sample.len(), 24 - holes.len());
        prop_assert_eq!(sample.dropped(), holes.len());
        prop_assert!(sample.rows.iter().all(|r| r.excess_return.is_finite()));
    }
}

// ── 4. Excess return ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn excess_return_scales_rf(asset in -0.5..0.5_f64, rf in 0.0..2.0_f64) {
        let excess = excess_return(asset, rf);
        prop_assert!((excess - (asset - rf / 100.0)).abs() < 1e-15);
        prop_assert!(excess <= asset);
    }
}

// ── 5. Recovery ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn noise_free_series_is_recovered(
        alpha in -0.01..0.01_f64,
        betas in prop::array::uniform5(-0.02..0.02_f64),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows: Vec<SampleRow> = (0..60u32)
            .map(|i| {
                let mut factors = [0.0; 5];
                for f in factors.iter_mut() {
                    *f = (rng.gen_range(-8.0..8.0_f64) * 100.0).round() / 100.0;
                }
                let rf = 0.1;
                let excess =
                    alpha + factors.iter().zip(betas.iter()).map(|(f, b)| f * b).sum::<f64>();
                let asset_return = excess + rf / 100.0;
                SampleRow {
                    month: month_at(i),
                    factors,
                    rf,
                    asset_return,
                    excess_return: excess,
                }
            })
            .collect();
        let sample = JoinedSample { joined: rows.len(), rows };

        let fit = fit_factor_model(&sample).unwrap();
        let estimates = fit.estimates();
        prop_assert!((estimates[0] - alpha).abs() < 1e-9);
        for (got, want) in estimates[1..].iter().zip(betas.iter()) {
            prop_assert!((got - want).abs() < 1e-9);
        }
    }
}
