//! Batch dispatch of per-ticker runs on a worker pool.
//!
//! Every ticker runs independently; a ticker that fails to load, errors, or
//! produces no rows is logged and reported in the summary without stopping
//! the batch.

use crate::loader::DataDir;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};
use weekly_factors::{FactorEngine, FactorOutput, RunContext, WeeklyFactorRecord};

/// Result of one batch.
#[derive(Debug, Default)]
pub(crate) struct BatchSummary {
    pub(crate) records: Vec<WeeklyFactorRecord>,
    pub(crate) computed: Vec<String>,
    pub(crate) empty: Vec<String>,
    pub(crate) failed: Vec<String>,
}

enum Outcome {
    Computed(String, Vec<WeeklyFactorRecord>),
    Empty(String),
    Failed(String),
}

fn run_ticker(engine: &FactorEngine, ctx: &RunContext, data: &DataDir, ticker: &str) -> Result<FactorOutput> {
    let input = data.security(ticker)?;
    Ok(engine.run(ctx, &input)?)
}

fn outcome(engine: &FactorEngine, ctx: &RunContext, data: &DataDir, ticker: &str) -> Outcome {
    let output = match run_ticker(engine, ctx, data, ticker) {
        Ok(output) => output,
        Err(err) => {
            warn!(ticker, error = %err, "run failed");
            return Outcome::Failed(ticker.to_string());
        }
    };

    if !output.diagnostics.is_empty() {
        info!(ticker, diagnostics = output.diagnostics.len(), "run completed with diagnostics");
    }
    if output.is_empty() {
        warn!(ticker, "run produced no rows");
        return Outcome::Empty(ticker.to_string());
    }

    match output.records() {
        Ok(records) => Outcome::Computed(ticker.to_string(), records),
        Err(err) => {
            warn!(ticker, error = %err, "panel conversion failed");
            Outcome::Failed(ticker.to_string())
        }
    }
}

/// Run every ticker on a pool of `workers` threads (all cores by default).
pub(crate) fn run_batch(
    engine: &FactorEngine,
    ctx: &RunContext,
    data: &DataDir,
    tickers: &[String],
    workers: Option<usize>,
) -> Result<BatchSummary> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers.unwrap_or(0)).build()?;

    let progress = ProgressBar::new(tickers.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let outcomes: Vec<Outcome> = pool.install(|| {
        tickers
            .par_iter()
            .map(|ticker| {
                let result = outcome(engine, ctx, data, ticker);
                progress.inc(1);
                result
            })
            .collect()
    });
    progress.finish_with_message("done");

    let mut summary = BatchSummary::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Computed(ticker, records) => {
                summary.records.extend(records);
                summary.computed.push(ticker);
            }
            Outcome::Empty(ticker) => summary.empty.push(ticker),
            Outcome::Failed(ticker) => summary.failed.push(ticker),
        }
    }

    info!(
        computed = summary.computed.len(),
        empty = summary.empty.len(),
        failed = summary.failed.len(),
        rows = summary.records.len(),
        "batch finished"
    );
    Ok(summary)
}
