//! FactorLab Runner: analysis configuration, pipeline, and reports.
//!
//! This crate builds on `factorlab-core` to provide:
//! - TOML-backed analysis configuration with defaults for every field
//! - The fetch, clean, fit, report pipeline over any price and factor source
//! - Text, LaTeX, and JSON report rendering with an alpha verdict

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{AnalysisConfig, ConfigError, DEFAULT_SIGNIFICANCE, DEFAULT_TICKER};
pub use pipeline::{
    analyze, clean, fetch_inputs, run_analysis, CleanedData, FetchedInputs, PipelineError,
};
pub use report::{
    render_json, render_latex, render_text, AlphaSign, AlphaVerdict, AnalysisReport, ReportFormat,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn analysis_report_is_send_sync() {
        assert_send::<AnalysisReport>();
        assert_sync::<AnalysisReport>();
    }

    #[test]
    fn pipeline_error_is_send_sync() {
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<AnalysisConfig>();
        assert_sync::<AnalysisConfig>();
    }
}
