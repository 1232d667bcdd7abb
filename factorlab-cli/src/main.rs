//! FactorLab CLI: regress one fund's excess returns on the five factors.
//!
//! With no arguments, fetches QQQ monthly prices from Yahoo Finance since
//! 1990-01-01 and the Ken French five-factor file, fits the model, and prints
//! the summary to stdout. Logs go to stderr; set `RUST_LOG` for more detail.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use factorlab_core::data::{
    CsvPriceFile, FactorFile, FactorSource, FrenchLibrary, PriceSource, SnapshotStore,
    YahooProvider,
};
use factorlab_core::domain::ReturnMethod;
use factorlab_runner::{analyze, fetch_inputs, AnalysisConfig, ReportFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "factorlab",
    about = "FactorLab: Fama-French five-factor regression for one fund"
)]
struct Cli {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fund ticker. Defaults to QQQ.
    #[arg(long)]
    ticker: Option<String>,

    /// First month of price history (YYYY-MM-DD). Defaults to 1990-01-01.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Return formula: simple or log. Defaults to simple.
    #[arg(long)]
    return_method: Option<ReturnMethod>,

    /// Output format: text, latex, or json. Defaults to text.
    #[arg(long)]
    format: Option<ReportFormat>,

    /// Significance level for the interpretation. Defaults to 0.05.
    #[arg(long)]
    significance: Option<f64>,

    /// Read frozen inputs from this snapshot directory instead of the network.
    #[arg(long, conflicts_with_all = ["prices", "factors"])]
    snapshot: Option<PathBuf>,

    /// Write the fetched inputs to this snapshot directory.
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Read monthly prices from a CSV file (date,open,high,low,close,volume,adj_close).
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Read the five-factor file from a local .zip or .csv.
    #[arg(long)]
    factors: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = build_config(&cli)?;
    let (prices, factors) = build_sources(&cli, &config)?;

    let inputs = fetch_inputs(&config, prices.as_ref(), factors.as_ref())
        .with_context(|| format!("failed to fetch inputs for {}", config.ticker))?;

    if let Some(dir) = &cli.save_snapshot {
        let meta = SnapshotStore::new(dir)
            .save(&inputs.prices, &inputs.factor_csv)
            .with_context(|| format!("failed to save snapshot to {}", dir.display()))?;
        tracing::info!(
            dir = %dir.display(),
            bars = meta.bar_count,
            "saved snapshot"
        );
    }

    let report = analyze(&config, &inputs).context("analysis failed")?;
    let rendered = report
        .render(config.format)
        .context("failed to render report")?;
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file values (or defaults), then flag overrides.
fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(ticker) = &cli.ticker {
        config.ticker = ticker.trim().to_ascii_uppercase();
    }
    if let Some(start) = cli.start {
        config.start_date = start;
    }
    if let Some(method) = cli.return_method {
        config.return_method = method;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(level) = cli.significance {
        config.significance = level;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_sources(
    cli: &Cli,
    config: &AnalysisConfig,
) -> Result<(Box<dyn PriceSource>, Box<dyn FactorSource>)> {
    if let Some(dir) = &cli.snapshot {
        return Ok((
            Box::new(SnapshotStore::new(dir)),
            Box::new(SnapshotStore::new(dir)),
        ));
    }

    let prices: Box<dyn PriceSource> = match &cli.prices {
        Some(path) => Box::new(CsvPriceFile::new(path)),
        None => Box::new(YahooProvider::new().context("failed to set up Yahoo client")?),
    };
    let factors: Box<dyn FactorSource> = match &cli.factors {
        Some(path) => Box::new(FactorFile::new(path)),
        None => Box::new(
            FrenchLibrary::new(config.factor_url.as_str())
                .context("failed to set up factor library client")?,
        ),
    };
    Ok((prices, factors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_gives_stock_run() {
        let cli = Cli::try_parse_from(["factorlab"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "factorlab",
            "--ticker",
            "spy",
            "--start",
            "2010-01-01",
            "--return-method",
            "log",
            "--format",
            "json",
            "--significance",
            "0.01",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.ticker, "SPY");
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(config.return_method, ReturnMethod::Log);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.significance, 0.01);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["factorlab", "--return-method", "arith"]).is_err());
        assert!(Cli::try_parse_from(["factorlab", "--start", "1990-13-01"]).is_err());

        let cli = Cli::try_parse_from(["factorlab", "--significance", "2"]).unwrap();
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn snapshot_conflicts_with_local_files() {
        assert!(Cli::try_parse_from([
            "factorlab",
            "--snapshot",
            "snap",
            "--prices",
            "prices.csv"
        ])
        .is_err());
    }

    #[test]
    fn local_files_pick_file_sources() {
        let cli = Cli::try_parse_from([
            "factorlab",
            "--prices",
            "prices.csv",
            "--factors",
            "ff5.zip",
        ])
        .unwrap();
        let (prices, factors) = build_sources(&cli, &AnalysisConfig::default()).unwrap();
        assert_eq!(prices.name(), "csv_file");
        assert_eq!(factors.name(), "factor_file");
    }
}
