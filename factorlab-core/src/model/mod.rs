//! Regression model: OLS fit and the distribution math behind its inference.

pub mod distributions;
pub mod ols;

pub use ols::{fit_factor_model, fit_ols, Coefficient, OlsFit, CONFIDENCE_LEVEL, INTERCEPT_NAME};

use thiserror::Error;

/// Errors from fitting a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no usable observations: the joined sample is empty")]
    EmptySample,

    #[error("rank-deficient design: {rows} usable rows for {cols} columns")]
    RankDeficient { rows: usize, cols: usize },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}
