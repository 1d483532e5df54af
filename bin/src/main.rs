//! CLI for the weekly factor engine.
//!
//! Lists and describes the registered factors and computes weekly factor
//! panels for a batch of tickers from per-ticker CSV files.

mod loader;
mod output;
mod runner;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use weekly_factors::{EngineConfig, FactorEngine, FactorInfo, FactorRegistry, daily_calendar};

#[derive(Parser)]
#[command(name = "weekly-factors")]
#[command(about = "Weekly factor panels from prices, fundamentals and analyst consensus", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration as JSON; absent fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured factors
    List,
    /// Show information about a specific factor
    Info {
        /// Factor name
        factor: String,
    },
    /// Compute weekly panels for a batch of tickers
    Compute {
        /// Directory holding prices/, statements/ and consensus/
        #[arg(long)]
        data_dir: PathBuf,
        /// Comma-separated tickers
        #[arg(long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
        /// Benchmark ticker, read from prices/
        #[arg(long, default_value = "SPY")]
        benchmark: String,
        /// First week-ending date kept (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last date kept, also written as updated_dt (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Worker threads (default: all cores)
        #[arg(long)]
        workers: Option<usize>,
        /// Output CSV (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => list_factors(&FactorRegistry::from_config(&config)?),
        Commands::Info { factor } => show_factor_info(&FactorRegistry::from_config(&config)?, &factor)?,
        Commands::Compute { data_dir, tickers, benchmark, start, end, workers, output } => {
            let engine = FactorEngine::new(config)?;
            let data = loader::DataDir::new(data_dir);

            let benchmark_bars = data
                .prices(&benchmark)
                .with_context(|| format!("failed to load benchmark {benchmark}"))?;
            // history before `start` feeds the lagged and rolling factors
            let first = benchmark_bars.iter().map(|b| b.date).min().unwrap_or(start).min(start);
            let ctx = engine.prepare(&benchmark_bars, &daily_calendar(first, end), start, end)?;
            info!(tickers = tickers.len(), %start, %end, "computing panels");

            let summary = runner::run_batch(&engine, &ctx, &data, &tickers, workers)?;
            output::write_panel(output.as_deref(), &engine.panel_columns(), &summary.records)?;

            if !summary.failed.is_empty() {
                eprintln!("Failed: {}", summary.failed.join(", "));
            }
            if !summary.empty.is_empty() {
                eprintln!("No rows: {}", summary.empty.join(", "));
            }
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

/// List all factors grouped by category.
fn list_factors(registry: &FactorRegistry) {
    let mut by_category: BTreeMap<String, Vec<FactorInfo>> = BTreeMap::new();
    for info in registry.all_info() {
        by_category.entry(info.category.to_string()).or_default().push(info);
    }

    println!("Available Factors ({} total)\n", registry.len());

    for (category, mut factors) in by_category {
        println!("{category}:");
        factors.sort_by(|a, b| a.name.cmp(&b.name));
        for info in factors {
            println!("  {} - {}", info.name, info.description);
        }
        println!();
    }
}

/// Show detailed information about a specific factor.
fn show_factor_info(registry: &FactorRegistry, factor_name: &str) -> Result<()> {
    let info = registry.info(factor_name).with_context(|| {
        format!("available factors: {}", registry.names().join(", "))
    })?;

    println!("Factor: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Frequency: {}", info.frequency);
    println!("Lookback: {} periods", info.lookback);
    println!("Outputs: {}", info.outputs.join(", "));
    println!("Required columns:");
    for col in &info.required_columns {
        println!("  - {col}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weekly_factors::FactorCategory;

    #[test]
    fn test_all_factors_have_info() {
        let registry = FactorRegistry::with_defaults();
        let all_info = registry.all_info();

        assert_eq!(all_info.len(), registry.len());
        for info in all_info {
            assert!(!info.name.is_empty());
            assert!(!info.description.is_empty());
            assert!(!info.required_columns.is_empty());
            assert!(!info.outputs.is_empty());
        }
    }

    #[test]
    fn test_factor_categories() {
        let registry = FactorRegistry::with_defaults();
        let categories: Vec<_> = registry.all_info().iter().map(|f| f.category).collect();

        for category in [
            FactorCategory::Momentum,
            FactorCategory::Value,
            FactorCategory::Quality,
            FactorCategory::Size,
            FactorCategory::Volatility,
            FactorCategory::Growth,
            FactorCategory::Sentiment,
        ] {
            assert!(categories.contains(&category), "{category}");
        }
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"week_end_day": 4}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.week_end_day, 4);
        assert_eq!(config.fundamentals, EngineConfig::default().fundamentals);

        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_cli_parses_compute() {
        let cli = Cli::try_parse_from([
            "weekly-factors", "compute", "--data-dir", "data", "--tickers", "AAA,BBB",
            "--start", "2020-01-01", "--end", "2020-12-31",
        ])
        .unwrap();

        let Commands::Compute { tickers, benchmark, start, .. } = cli.command else {
            panic!("expected compute");
        };
        assert_eq!(tickers, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(benchmark, "SPY");
        assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }
}
