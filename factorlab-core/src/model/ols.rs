//! Closed-form ordinary least squares with classical inference.
//!
//! `β = (XᵀX)⁻¹Xᵀy`, homoskedastic standard errors `sqrt(σ² · diag((XᵀX)⁻¹))`
//! with `σ² = SSR / (n - k)`. No regularization and no iteration.

use super::distributions::{f_survival, t_quantile, t_two_sided_p};
use super::ModelError;
use crate::domain::{JoinedSample, FACTOR_NAMES};
use nalgebra::DMatrix;
use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Name given to the intercept column.
pub const INTERCEPT_NAME: &str = "const";

/// Confidence level of the reported coefficient intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// A Cholesky pivot of `XᵀX` below this fraction of its largest diagonal
/// entry marks the design as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Estimate and inference for one regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_stat: f64,
    /// Two-sided p-value against a zero coefficient.
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl Coefficient {
    pub fn is_significant(&self, level: f64) -> bool {
        self.p_value < level
    }
}

/// An immutable OLS fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Intercept first, then slopes in design order.
    pub coefficients: Vec<Coefficient>,
    pub n_obs: usize,
    /// Regressors excluding the intercept.
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub durbin_watson: f64,
    /// Residual standard error `sqrt(SSR / df_resid)`.
    pub sigma: f64,
    pub residuals: Vec<f64>,
}

impl OlsFit {
    /// The intercept ("alpha" in a factor regression).
    pub fn intercept(&self) -> Option<&Coefficient> {
        self.coefficients.first()
    }

    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }
}

/// Regress excess return on the five factors plus an intercept.
pub fn fit_factor_model(sample: &JoinedSample) -> Result<OlsFit, ModelError> {
    if sample.is_empty() {
        return Err(ModelError::EmptySample);
    }
    let regressors: Vec<Vec<f64>> = (0..FACTOR_NAMES.len())
        .map(|i| sample.factor_column(i))
        .collect();
    fit_ols(&sample.excess_returns(), &regressors, &FACTOR_NAMES)
}

/// Fit `y` on the given regressor columns plus a leading intercept column of ones.
pub fn fit_ols(y: &[f64], regressors: &[Vec<f64>], names: &[&str]) -> Result<OlsFit, ModelError> {
    let n = y.len();
    let k = regressors.len() + 1;

    if names.len() != regressors.len() {
        return Err(ModelError::DimensionMismatch(format!(
            "{} regressors but {} names",
            regressors.len(),
            names.len()
        )));
    }
    if n == 0 {
        return Err(ModelError::EmptySample);
    }
    if let Some(bad) = regressors.iter().position(|c| c.len() != n) {
        return Err(ModelError::DimensionMismatch(format!(
            "regressor '{}' has {} rows, response has {n}",
            names[bad],
            regressors[bad].len()
        )));
    }
    if n <= k {
        return Err(ModelError::RankDeficient { rows: n, cols: k });
    }

    let mut x = Array2::<f64>::ones((n, k));
    for (j, column) in regressors.iter().enumerate() {
        x.column_mut(j + 1).assign(&ArrayView1::from(column.as_slice()));
    }
    let y = ArrayView1::from(y);

    let xtx = x.t().dot(&x);
    let xty = x.t().dot(&y);
    let xtx_inv = invert_gram(&xtx).ok_or(ModelError::RankDeficient { rows: n, cols: k })?;
    let beta = xtx_inv.dot(&xty);

    let fitted = x.dot(&beta);
    let residuals: Array1<f64> = &y - &fitted;

    let n_f = n as f64;
    let df_resid = n - k;
    let df_model = k - 1;
    let df_r = df_resid as f64;
    let df_m = df_model as f64;

    let ssr = residuals.dot(&residuals);
    let mean_y = y.sum() / n_f;
    let sst: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();

    let sigma2 = ssr / df_r;
    let t_crit = t_quantile(0.5 + CONFIDENCE_LEVEL / 2.0, df_r);

    let mut names_all = Vec::with_capacity(k);
    names_all.push(INTERCEPT_NAME);
    names_all.extend_from_slice(names);

    let coefficients = names_all
        .iter()
        .zip(&beta)
        .enumerate()
        .map(|(j, (name, &estimate))| {
            let std_error = (sigma2 * xtx_inv[[j, j]]).max(0.0).sqrt();
            let t_stat = estimate / std_error;
            Coefficient {
                name: name.to_string(),
                estimate,
                std_error,
                t_stat,
                p_value: t_two_sided_p(t_stat, df_r),
                ci_lower: estimate - t_crit * std_error,
                ci_upper: estimate + t_crit * std_error,
            }
        })
        .collect();

    let (r_squared, adj_r_squared) = if sst > 0.0 {
        let r2 = 1.0 - ssr / sst;
        (r2, 1.0 - (1.0 - r2) * (n_f - 1.0) / df_r)
    } else {
        (f64::NAN, f64::NAN)
    };

    let f_statistic = ((sst - ssr) / df_m) / (ssr / df_r);
    let f_p_value = f_survival(f_statistic, df_m, df_r);

    let log_likelihood =
        -n_f / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / n_f).ln() + 1.0);
    let k_f = k as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k_f;
    let bic = -2.0 * log_likelihood + k_f * n_f.ln();

    let diffs = &residuals.slice(s![1..]) - &residuals.slice(s![..-1]);
    let durbin_watson = diffs.dot(&diffs) / ssr;

    tracing::debug!(n_obs = n, r_squared, "fitted OLS");

    Ok(OlsFit {
        coefficients,
        n_obs: n,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
        durbin_watson,
        sigma: sigma2.sqrt(),
        residuals: residuals.to_vec(),
    })
}

/// `(XᵀX)⁻¹` through a Cholesky factorization, or `None` when `XᵀX` is singular.
fn invert_gram(xtx: &Array2<f64>) -> Option<Array2<f64>> {
    let k = xtx.nrows();
    let gram = DMatrix::from_fn(k, k, |i, j| xtx[[i, j]]);
    let scale = gram
        .diagonal()
        .iter()
        .fold(0.0_f64, |m, d| m.max(d.abs()))
        .max(f64::MIN_POSITIVE);

    let chol = gram.cholesky()?;
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |m, d| m.min(d * d));
    if !(min_pivot > SINGULAR_TOLERANCE * scale) {
        return None;
    }

    let inv = chol.inverse();
    Some(Array2::from_shape_fn((k, k), |(i, j)| inv[(i, j)]))
}
