//! Straight-line analysis pipeline: fetch, clean, fit, report.
//!
//! Two entry points:
//! - `run_analysis()`: fetches from the given sources, then analyzes. Used by the CLI.
//! - `analyze()`: takes already-fetched inputs. Used when the same inputs are
//!   also written to a snapshot, and by the idempotency tests.
//!
//! Every stage is terminal on failure; nothing is retried.

use factorlab_core::data::{
    build_sample, join_series, parse_factor_table, period_returns, DataError, FactorSource,
    PriceSource,
};
use factorlab_core::domain::{FactorTable, JoinedSample, Month, PriceHistory, ReturnMethod};
use factorlab_core::fingerprint::sample_fingerprint;
use factorlab_core::model::{fit_factor_model, ModelError};
use thiserror::Error;

use crate::config::{AnalysisConfig, ConfigError};
use crate::report::AnalysisReport;

/// Rows shown when logging the head of each table.
const HEAD_ROWS: usize = 5;

/// Errors from the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error(
        "no overlapping months: {price_months} price months, {factor_months} factor months"
    )]
    NoOverlap {
        price_months: usize,
        factor_months: usize,
    },
}

/// Raw inputs as the two sources returned them.
#[derive(Debug, Clone)]
pub struct FetchedInputs {
    pub prices: PriceHistory,
    /// Factor file text, before any parsing.
    pub factor_csv: String,
    pub price_source: String,
    pub factor_source: String,
}

/// Typed, month-keyed inputs and the regression sample built from them.
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub returns: Vec<(Month, Option<f64>)>,
    pub factors: FactorTable,
    pub sample: JoinedSample,
}

/// Fetch prices and factors from the given sources.
pub fn fetch_inputs(
    config: &AnalysisConfig,
    prices: &dyn PriceSource,
    factors: &dyn FactorSource,
) -> Result<FetchedInputs, PipelineError> {
    tracing::info!(
        ticker = %config.ticker,
        start = %config.start_date,
        source = prices.name(),
        "fetching monthly prices"
    );
    let history = prices.fetch_monthly(&config.ticker, config.start_date)?;
    tracing::info!(bars = history.len(), "fetched prices");

    tracing::info!(source = factors.name(), "fetching five-factor file");
    let factor_csv = factors.fetch_factor_csv()?;
    tracing::info!(bytes = factor_csv.len(), "fetched factor file");

    Ok(FetchedInputs {
        prices: history,
        factor_csv,
        price_source: prices.name().to_string(),
        factor_source: factors.name().to_string(),
    })
}

/// Derive returns, parse the factor table, join on month, and drop incomplete rows.
pub fn clean(inputs: &FetchedInputs, method: ReturnMethod) -> Result<CleanedData, PipelineError> {
    let returns = period_returns(&inputs.prices, method);
    let factors = parse_factor_table(&inputs.factor_csv)?;
    log_heads(&inputs.prices, &factors);

    let joined = join_series(&returns, &factors);
    if joined.is_empty() {
        return Err(PipelineError::NoOverlap {
            price_months: returns.len(),
            factor_months: factors.len(),
        });
    }

    let sample = build_sample(joined);
    if sample.dropped() > 0 {
        tracing::warn!(
            dropped = sample.dropped(),
            "joined months dropped for missing values"
        );
    }
    tracing::info!(
        joined = sample.joined,
        retained = sample.len(),
        first = ?sample.first_month().map(|m| m.to_string()),
        last = ?sample.last_month().map(|m| m.to_string()),
        "built regression sample"
    );

    Ok(CleanedData {
        returns,
        factors,
        sample,
    })
}

/// Clean already-fetched inputs, fit the model, and assemble the report. No I/O.
pub fn analyze(
    config: &AnalysisConfig,
    inputs: &FetchedInputs,
) -> Result<AnalysisReport, PipelineError> {
    let cleaned = clean(inputs, config.return_method)?;
    let fit = fit_factor_model(&cleaned.sample)?;
    let fingerprint = sample_fingerprint(&cleaned.sample);
    tracing::info!(
        n_obs = fit.n_obs,
        r_squared = fit.r_squared,
        fingerprint = %fingerprint,
        "fitted five-factor model"
    );

    Ok(AnalysisReport::new(
        config,
        inputs,
        &cleaned.sample,
        fingerprint,
        fit,
    ))
}

/// Validate the configuration, fetch from the sources, and analyze.
pub fn run_analysis(
    config: &AnalysisConfig,
    prices: &dyn PriceSource,
    factors: &dyn FactorSource,
) -> Result<AnalysisReport, PipelineError> {
    config.validate()?;
    let inputs = fetch_inputs(config, prices, factors)?;
    analyze(config, &inputs)
}

fn log_heads(prices: &PriceHistory, factors: &FactorTable) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for bar in prices.bars().iter().take(HEAD_ROWS) {
        tracing::debug!(
            month = %bar.month,
            close = bar.close,
            volume = bar.volume,
            "price head"
        );
    }
    for row in factors.rows.iter().take(HEAD_ROWS) {
        tracing::debug!(
            month = %row.month,
            factors = ?row.factors,
            rf = ?row.rf,
            "factor head"
        );
    }
}
