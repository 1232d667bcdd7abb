//! Regression report: the assembled result and its text, LaTeX, and JSON renderings.

use factorlab_core::domain::{JoinedSample, Month, ReturnMethod};
use factorlab_core::model::{Coefficient, OlsFit, CONFIDENCE_LEVEL, INTERCEPT_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::pipeline::FetchedInputs;

const WIDTH: usize = 78;

/// Output format for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Summary table in the layout of a statistics package.
    #[default]
    Text,
    /// `tabular` blocks for a paper.
    Latex,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Latex => write!(f, "latex"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "latex" | "tex" => Ok(ReportFormat::Latex),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "unknown report format '{other}' (expected text, latex, or json)"
            )),
        }
    }
}

/// Sign of the estimated intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaSign {
    Positive,
    Negative,
    Zero,
}

/// Plain-language reading of the intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaVerdict {
    pub sign: AlphaSign,
    /// Intercept expressed as percent per month.
    pub monthly_percent: f64,
    pub p_value: f64,
    pub significant: bool,
}

impl AlphaVerdict {
    pub fn from_fit(fit: &OlsFit, level: f64) -> Option<Self> {
        let alpha = fit.intercept()?;
        let sign = if alpha.estimate > 0.0 {
            AlphaSign::Positive
        } else if alpha.estimate < 0.0 {
            AlphaSign::Negative
        } else {
            AlphaSign::Zero
        };
        Some(Self {
            sign,
            monthly_percent: alpha.estimate * 100.0,
            p_value: alpha.p_value,
            significant: alpha.is_significant(level),
        })
    }

    pub fn sentence(&self, level: f64) -> String {
        let sign = match self.sign {
            AlphaSign::Positive => "positive",
            AlphaSign::Negative => "negative",
            AlphaSign::Zero => "zero",
        };
        let significance = if self.significant {
            "statistically significant"
        } else {
            "not statistically significant"
        };
        format!(
            "Alpha is {sign} ({:+.4}% per month) and {significance} at the {} level (p = {:.4}).",
            self.monthly_percent,
            format_level(level),
            self.p_value
        )
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub return_method: ReturnMethod,
    pub significance: f64,
    pub price_source: String,
    pub factor_source: String,
    pub first_month: Option<Month>,
    pub last_month: Option<Month>,
    /// Months present in both series before missing values were dropped.
    pub joined_rows: usize,
    pub dropped_rows: usize,
    /// BLAKE3 of the regression sample.
    pub fingerprint: String,
    pub alpha: Option<AlphaVerdict>,
    /// Slopes significant at `significance`, in design order.
    pub significant_factors: Vec<String>,
    pub fit: OlsFit,
}

impl AnalysisReport {
    pub fn new(
        config: &AnalysisConfig,
        inputs: &FetchedInputs,
        sample: &JoinedSample,
        fingerprint: String,
        fit: OlsFit,
    ) -> Self {
        let significant_factors = fit
            .coefficients
            .iter()
            .filter(|c| c.name != INTERCEPT_NAME && c.is_significant(config.significance))
            .map(|c| c.name.clone())
            .collect();

        Self {
            ticker: inputs.prices.ticker.clone(),
            return_method: config.return_method,
            significance: config.significance,
            price_source: inputs.price_source.clone(),
            factor_source: inputs.factor_source.clone(),
            first_month: sample.first_month(),
            last_month: sample.last_month(),
            joined_rows: sample.joined,
            dropped_rows: sample.dropped(),
            fingerprint,
            alpha: AlphaVerdict::from_fit(&fit, config.significance),
            significant_factors,
            fit,
        }
    }

    pub fn n_obs(&self) -> usize {
        self.fit.n_obs
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Text => Ok(render_text(self)),
            ReportFormat::Latex => Ok(render_latex(self)),
            ReportFormat::Json => render_json(self),
        }
    }

    fn period(&self) -> String {
        match (self.first_month, self.last_month) {
            (Some(first), Some(last)) => format!("{first} to {last}"),
            _ => "empty".to_string(),
        }
    }
}

// ── Text ─────────────────────────────────────────────────────────────

/// Summary table, coefficient table, diagnostics, and interpretation.
pub fn render_text(report: &AnalysisReport) -> String {
    let fit = &report.fit;
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let mut out = String::new();

    out.push_str(&format!("{:^WIDTH$}\n", "Five-Factor OLS Regression Results"));
    out.push_str(&format!("{heavy}\n"));

    let rows = [
        (
            ("Dep. Variable:", "Excess Return".to_string()),
            ("R-squared:", format!("{:.3}", fit.r_squared)),
        ),
        (
            ("Ticker:", report.ticker.clone()),
            ("Adj. R-squared:", format!("{:.3}", fit.adj_r_squared)),
        ),
        (
            ("Model:", "OLS".to_string()),
            ("F-statistic:", format_stat(fit.f_statistic)),
        ),
        (
            ("Return method:", report.return_method.to_string()),
            ("Prob (F-statistic):", format_p(fit.f_p_value)),
        ),
        (
            ("Sample:", report.period()),
            ("Log-Likelihood:", format!("{:.2}", fit.log_likelihood)),
        ),
        (
            ("No. Observations:", fit.n_obs.to_string()),
            ("AIC:", format!("{:.2}", fit.aic)),
        ),
        (
            ("Df Residuals:", fit.df_resid.to_string()),
            ("BIC:", format!("{:.2}", fit.bic)),
        ),
        (
            ("Df Model:", fit.df_model.to_string()),
            ("Durbin-Watson:", format!("{:.3}", fit.durbin_watson)),
        ),
        (
            ("Dropped rows:", report.dropped_rows.to_string()),
            ("Residual std. err.:", format!("{:.5}", fit.sigma)),
        ),
    ];
    for ((ll, lv), (rl, rv)) in &rows {
        out.push_str(&format!("{ll:<20}{lv:>18} {rl:<22}{rv:>17}\n"));
    }

    out.push_str(&format!("{heavy}\n"));
    let (lo, hi) = ci_labels();
    out.push_str(&format!(
        "{:<10}{:>11}{:>11}{:>11}{:>11}{:>12}{:>12}\n",
        "", "coef", "std err", "t", "P>|t|", lo, hi
    ));
    out.push_str(&format!("{light}\n"));
    for c in &fit.coefficients {
        out.push_str(&format!(
            "{:<10}{:>11.4}{:>11.4}{:>11.3}{:>11.3}{:>12.4}{:>12.4}\n",
            c.name, c.estimate, c.std_error, c.t_stat, c.p_value, c.ci_lower, c.ci_upper
        ));
    }
    out.push_str(&format!("{heavy}\n"));
    out.push_str(&format!(
        "Prices: {}   Factors: {}\n",
        report.price_source, report.factor_source
    ));
    out.push_str(&format!("Sample fingerprint: {}\n", report.fingerprint));
    out.push('\n');

    out.push_str(&format!(
        "Interpretation (significance level {})\n",
        format_level(report.significance)
    ));
    out.push_str(&format!("{light}\n"));
    for c in &fit.coefficients {
        out.push_str(&format!("{}\n", interpret(c, report.significance)));
    }
    if let Some(alpha) = &report.alpha {
        out.push('\n');
        out.push_str(&format!("{}\n", alpha.sentence(report.significance)));
    }
    out
}

fn interpret(c: &Coefficient, level: f64) -> String {
    let label = if c.name == INTERCEPT_NAME {
        format!("{} (alpha)", c.name)
    } else {
        c.name.clone()
    };
    let verdict = if c.is_significant(level) {
        "significant"
    } else {
        "not significant"
    };
    format!("{label:<16}{verdict:<18}p = {}", format_p(c.p_value))
}

// ── LaTeX ────────────────────────────────────────────────────────────

/// Summary and coefficient `tabular` blocks.
pub fn render_latex(report: &AnalysisReport) -> String {
    let fit = &report.fit;
    let mut out = String::new();

    out.push_str("\\begin{center}\n");
    out.push_str("\\begin{tabular}{lclc}\n");
    out.push_str("\\toprule\n");
    let summary = [
        (
            "Dep. Variable:",
            "Excess Return".to_string(),
            "R-squared:",
            format!("{:.3}", fit.r_squared),
        ),
        (
            "Ticker:",
            escape_latex(&report.ticker),
            "Adj. R-squared:",
            format!("{:.3}", fit.adj_r_squared),
        ),
        (
            "Return method:",
            report.return_method.to_string(),
            "F-statistic:",
            format_stat(fit.f_statistic),
        ),
        (
            "Sample:",
            report.period(),
            "Prob (F-statistic):",
            format_p(fit.f_p_value),
        ),
        (
            "No. Observations:",
            fit.n_obs.to_string(),
            "Log-Likelihood:",
            format!("{:.2}", fit.log_likelihood),
        ),
        (
            "Df Residuals:",
            fit.df_resid.to_string(),
            "AIC:",
            format!("{:.2}", fit.aic),
        ),
        (
            "Df Model:",
            fit.df_model.to_string(),
            "BIC:",
            format!("{:.2}", fit.bic),
        ),
    ];
    for (ll, lv, rl, rv) in &summary {
        out.push_str(&format!("\\textbf{{{ll}}} & {lv} & \\textbf{{{rl}}} & {rv} \\\\\n"));
    }
    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabular}\n");

    let (lo, hi) = ci_labels();
    out.push_str("\\begin{tabular}{lcccccc}\n");
    out.push_str("\\toprule\n");
    out.push_str(" & \\textbf{coef} & \\textbf{std err} & \\textbf{t} & \\textbf{P$> |$t$|$}");
    out.push_str(&format!(" & \\textbf{{{lo}}} & \\textbf{{{hi}}} \\\\\n"));
    out.push_str("\\midrule\n");
    for c in &fit.coefficients {
        out.push_str(&format!(
            "\\textbf{{{}}} & {:.4} & {:.4} & {:.3} & {:.3} & {:.4} & {:.4} \\\\\n",
            escape_latex(&c.name),
            c.estimate,
            c.std_error,
            c.t_stat,
            c.p_value,
            c.ci_lower,
            c.ci_upper
        ));
    }
    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabular}\n");
    out.push_str("%\\caption{Five-Factor OLS Regression Results}\n");
    out.push_str("\\end{center}\n");
    out
}

fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

// ── JSON ─────────────────────────────────────────────────────────────

pub fn render_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

// ── Number formatting ────────────────────────────────────────────────

/// Column labels for the interval bounds, e.g. `[0.025` and `0.975]`.
fn ci_labels() -> (String, String) {
    let tail = (1.0 - CONFIDENCE_LEVEL) / 2.0;
    (format!("[{tail:.3}"), format!("{:.3}]", 1.0 - tail))
}

fn format_stat(v: f64) -> String {
    if v.is_finite() && (v == 0.0 || (1e-3..1e6).contains(&v.abs())) {
        format!("{v:.2}")
    } else {
        format!("{v:.3e}")
    }
}

fn format_p(p: f64) -> String {
    if p.is_finite() && p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

/// `0.05` prints as `5%`, `0.001` as `0.1%`.
fn format_level(level: f64) -> String {
    let pct = level * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}%", pct.round())
    } else {
        format!("{pct}%")
    }
}
