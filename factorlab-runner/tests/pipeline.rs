//! End-to-end pipeline tests on the frozen QQQ and five-factor fixtures.
//!
//! Locks the fitted coefficients on the core fixtures, checks that a snapshot
//! of the same inputs reproduces the run exactly, and covers each fatal path.

use factorlab_core::data::{CsvPriceFile, DataError, FactorFile, SnapshotStore};
use factorlab_core::domain::{Month, ReturnMethod};
use factorlab_core::model::ModelError;
use factorlab_runner::{
    analyze, fetch_inputs, run_analysis, AnalysisConfig, PipelineError, ReportFormat,
};
use std::path::PathBuf;

fn core_fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("factorlab-core/tests/fixtures")
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_prices() -> CsvPriceFile {
    CsvPriceFile::new(core_fixture_dir().join("qqq_monthly.csv"))
}

fn fixture_factors() -> FactorFile {
    FactorFile::new(core_fixture_dir().join("ff5_monthly.zip"))
}

#[test]
fn fixture_run_locks_coefficients() {
    let config = AnalysisConfig::default();
    let report = run_analysis(&config, &fixture_prices(), &fixture_factors()).unwrap();

    assert_eq!(report.ticker, "QQQ");
    assert_eq!(report.n_obs(), 48);
    assert_eq!(report.first_month, Month::new(2019, 1));
    assert_eq!(report.last_month, Month::new(2022, 12));
    assert_eq!(report.dropped_rows, 0);
    assert_eq!(report.fingerprint.len(), 64);

    let alpha = report.alpha.as_ref().unwrap();
    assert!(alpha.significant);
    assert!((alpha.monthly_percent - 0.366_119_565_315_146_8).abs() < 1e-7);

    let mkt = report.fit.coefficient("Mkt-RF").unwrap();
    assert!((mkt.estimate - 0.010_862_346_378_632_154).abs() < 1e-9);
    assert!((report.fit.r_squared - 0.989_985_773_927_346).abs() < 1e-9);

    assert_eq!(
        report.significant_factors,
        vec!["Mkt-RF", "SMB", "HML", "RMW", "CMA"]
    );
}

#[test]
fn snapshot_rerun_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default();

    let inputs = fetch_inputs(&config, &fixture_prices(), &fixture_factors()).unwrap();
    let live = analyze(&config, &inputs).unwrap();

    let store = SnapshotStore::new(dir.path().join("qqq"));
    store.save(&inputs.prices, &inputs.factor_csv).unwrap();

    let first = run_analysis(&config, &store, &store).unwrap();
    let second = run_analysis(&config, &store, &store).unwrap();

    assert_eq!(first.fit, second.fit);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.fit, live.fit);
    assert_eq!(first.fingerprint, live.fingerprint);
    assert_eq!(first.price_source, "snapshot");
}

#[test]
fn log_returns_are_labelled_and_differ() {
    let simple = run_analysis(&AnalysisConfig::default(), &fixture_prices(), &fixture_factors())
        .unwrap();
    let config = AnalysisConfig {
        return_method: ReturnMethod::Log,
        ..Default::default()
    };
    let log = run_analysis(&config, &fixture_prices(), &fixture_factors()).unwrap();

    assert_eq!(log.return_method, ReturnMethod::Log);
    assert_eq!(log.n_obs(), simple.n_obs());
    assert_ne!(log.fingerprint, simple.fingerprint);
    assert!(log.render(ReportFormat::Text).unwrap().contains("log"));
}

#[test]
fn every_format_renders() {
    let report = run_analysis(&AnalysisConfig::default(), &fixture_prices(), &fixture_factors())
        .unwrap();

    let text = report.render(ReportFormat::Text).unwrap();
    assert!(text.contains("No. Observations:"));
    assert!(text.contains("2019-01 to 2022-12"));

    let tex = report.render(ReportFormat::Latex).unwrap();
    assert!(tex.contains("\\begin{tabular}"));

    let json = report.render(ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["ticker"], "QQQ");
    assert_eq!(value["return_method"], "simple");
    assert_eq!(value["fit"]["n_obs"], 48);
}

#[test]
fn missing_marker_is_fatal() {
    let factors = FactorFile::new(fixture_dir().join("ff5_no_marker.csv"));
    let err = run_analysis(&AnalysisConfig::default(), &fixture_prices(), &factors).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Data(DataError::MalformedInput(ref msg)) if msg.contains("marker")
    ));
}

#[test]
fn disjoint_periods_have_no_overlap() {
    let prices = CsvPriceFile::new(fixture_dir().join("qqq_2015.csv"));
    let err = run_analysis(&AnalysisConfig::default(), &prices, &fixture_factors()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::NoOverlap {
            price_months: 12,
            factor_months: 48
        }
    ));
}

#[test]
fn short_sample_is_rank_deficient() {
    // Starting in 2022-08 leaves 2022-09 through 2022-12: four usable rows
    let config = AnalysisConfig {
        start_date: chrono::NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
        ..Default::default()
    };
    let err = run_analysis(&config, &fixture_prices(), &fixture_factors()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Model(ModelError::RankDeficient { rows: 4, cols: 6 })
    ));
}

#[test]
fn snapshot_for_another_ticker_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::default();
    let inputs = fetch_inputs(&config, &fixture_prices(), &fixture_factors()).unwrap();
    let store = SnapshotStore::new(dir.path());
    store.save(&inputs.prices, &inputs.factor_csv).unwrap();

    let spy = AnalysisConfig {
        ticker: "SPY".into(),
        ..Default::default()
    };
    let err = run_analysis(&spy, &store, &store).unwrap_err();
    assert!(matches!(err, PipelineError::Data(DataError::Snapshot(_))));
}
