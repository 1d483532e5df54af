//! Per-security pipeline.
//!
//! A run moves through four phases and never loops back:
//!
//! 1. **Guard**: an empty price or statement table ends the run with an empty
//!    panel.
//! 2. **Stage 1**: quarterly statements are reconciled, aggregated into
//!    trailing, growth and dispersion columns, and the quarterly ratios are
//!    applied.
//! 3. **Stage 2**: the calendar, the price bars, the stage-1 table and every
//!    daily factor are merged on date, forward-filled, and the valuation
//!    ratios are applied.
//! 4. **Finalize**: week-ending rows inside the run's range are kept, staging
//!    columns dropped, non-finite values turned into missing, and rows
//!    without a ticker or report date removed.
//!
//! A run is a pure function of its inputs and the [`RunContext`]; the engine
//! keeps no state between runs.

use crate::{
    Diagnostics, EngineConfig, FactorError, FactorRegistry, Result, SecurityInput, Stage,
    WeeklyFactorRecord, consensus,
    frame::{self, DATE},
    fundamentals,
    ratio::apply_ratios,
    traits::{DailyInputs, InputSource},
    types::{CalendarRow, LineItem, PriceBar},
};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Identifying and price columns leading every panel.
const LEADING: [&str; 3] = [frame::TICKER, DATE, frame::REPORT_DATE];
const LEADING_VALUES: [&str; 2] = [frame::CLOSE, frame::MARKET_CAP];

/// Raw tables for one security.
///
/// `prices` needs `date` plus any of the price columns, `statements` needs
/// `date` (quarter end), `report_date`, optionally `ticker`, and any line
/// items, `consensus` needs `date` and `target_median_price`. Absent value
/// columns only disable the factors that read them.
#[derive(Debug, Clone)]
pub struct InputFrames {
    /// Security identifier
    pub ticker: String,
    /// Daily price bars
    pub prices: DataFrame,
    /// Quarterly statements
    pub statements: DataFrame,
    /// Consensus updates
    pub consensus: DataFrame,
}

impl InputFrames {
    /// Tables built from typed records.
    pub fn from_security(input: &SecurityInput) -> Result<Self> {
        Ok(Self {
            ticker: input.ticker.clone(),
            prices: frame::price_frame(&input.prices)?,
            statements: frame::statement_frame(&input.statements)?,
            consensus: frame::consensus_frame(&input.consensus)?,
        })
    }
}

/// Inputs shared by every security of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    benchmark: DataFrame,
    calendar: DataFrame,
    start: NaiveDate,
    end: NaiveDate,
}

impl RunContext {
    /// Reconciled benchmark prices with period-end labels.
    pub const fn benchmark(&self) -> &DataFrame {
        &self.benchmark
    }

    /// Calendar with `date` and `day_of_week`.
    pub const fn calendar(&self) -> &DataFrame {
        &self.calendar
    }

    /// First date kept in the output.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date kept in the output, also written as `updated_dt`.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Result of one security's run.
#[derive(Debug, Clone)]
pub struct FactorOutput {
    /// Security identifier
    pub ticker: String,
    /// One row per week-ending date; empty when the guard tripped
    pub panel: DataFrame,
    /// Everything that kept part of the run from producing values
    pub diagnostics: Diagnostics,
}

impl FactorOutput {
    /// Whether no rows were produced.
    pub fn is_empty(&self) -> bool {
        self.panel.height() == 0
    }

    /// Panel rows as typed records.
    pub fn records(&self) -> Result<Vec<WeeklyFactorRecord>> {
        let panel = &self.panel;
        let tickers: Vec<Option<&str>> = panel.column(frame::TICKER)?.str()?.into_iter().collect();
        let dates = frame::parse_dates(panel)?;
        let report_dates = frame::parse_date_column(panel, frame::REPORT_DATE)?;
        let updated = frame::parse_date_column(panel, frame::UPDATED_DT)?;

        let mut values = Vec::new();
        for column in panel.get_columns() {
            if column.dtype() == &DataType::Float64 {
                let name = column.name().to_string();
                values.push((name.clone(), frame::f64_values(panel, &name)?));
            }
        }

        (0..panel.height())
            .map(|row| -> Result<WeeklyFactorRecord> {
                let ticker = tickers[row]
                    .ok_or_else(|| FactorError::MalformedInput("panel row without ticker".to_string()))?;
                let factors: BTreeMap<String, Option<f64>> =
                    values.iter().map(|(name, column)| (name.clone(), column[row])).collect();
                Ok(WeeklyFactorRecord {
                    ticker: ticker.to_string(),
                    as_of_date: dates[row],
                    report_date: report_dates[row],
                    factors,
                    updated_dt: updated[row],
                })
            })
            .collect()
    }
}

/// Computes weekly factor panels, one security at a time.
#[derive(Debug)]
pub struct FactorEngine {
    config: EngineConfig,
    registry: FactorRegistry,
}

impl FactorEngine {
    /// Engine for a validated configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = FactorRegistry::from_config(&config)?;
        Ok(Self { config, registry })
    }

    /// Active configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Factors evaluated by this engine.
    pub const fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Output columns of every panel, in order.
    pub fn panel_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> =
            LEADING.iter().chain(&LEADING_VALUES).map(|c| (*c).to_string()).collect();
        for output in self.registry.output_columns() {
            if !columns.contains(&output) {
                columns.push(output);
            }
        }
        columns.push(frame::UPDATED_DT.to_string());
        columns
    }

    /// Shared context from typed benchmark bars and calendar rows.
    pub fn prepare(
        &self,
        benchmark: &[PriceBar],
        calendar: &[CalendarRow],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RunContext> {
        self.prepare_frames(&frame::price_frame(benchmark)?, &frame::calendar_frame(calendar)?, start, end)
    }

    /// Shared context from raw benchmark and calendar tables.
    pub fn prepare_frames(
        &self,
        benchmark: &DataFrame,
        calendar: &DataFrame,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RunContext> {
        if start > end {
            return Err(FactorError::InvalidDateRange { start: start.to_string(), end: end.to_string() });
        }

        frame::require_dates(calendar, "calendar")?;
        let day_of_week = calendar
            .column(frame::DAY_OF_WEEK)
            .map_err(|_| FactorError::MissingColumn(format!("calendar.{}", frame::DAY_OF_WEEK)))?;
        if !frame::is_numeric(day_of_week.dtype()) {
            return Err(FactorError::MalformedInput(format!(
                "calendar.{} must be numeric, found {}",
                frame::DAY_OF_WEEK,
                day_of_week.dtype()
            )));
        }
        let calendar = frame::first_per_date(
            &calendar
                .clone()
                .lazy()
                .select([col(DATE), col(frame::DAY_OF_WEEK).cast(DataType::Int32)])
                .collect()?,
        )?;

        let benchmark = if benchmark.height() == 0 {
            price_columns(&frame::price_frame(&[])?)?
        } else {
            reconcile_prices(benchmark, "benchmark")?
        };

        Ok(RunContext {
            benchmark: frame::with_period_ends(&benchmark, self.config.week_end_day)?,
            calendar,
            start,
            end,
        })
    }

    /// Run one security from typed records.
    pub fn run(&self, ctx: &RunContext, input: &SecurityInput) -> Result<FactorOutput> {
        self.run_frames(ctx, &InputFrames::from_security(input)?)
    }

    /// Run one security from raw tables.
    pub fn run_frames(&self, ctx: &RunContext, inputs: &InputFrames) -> Result<FactorOutput> {
        let mut diagnostics = Diagnostics::new(inputs.ticker.as_str());

        for (name, table) in [("prices", &inputs.prices), ("statements", &inputs.statements)] {
            if table.height() == 0 {
                diagnostics.empty_input(name);
            }
        }
        if diagnostics.has_empty_input() {
            return Ok(FactorOutput {
                ticker: inputs.ticker.clone(),
                panel: self.empty_panel()?,
                diagnostics,
            });
        }

        let prices = frame::with_period_ends(
            &reconcile_prices(&inputs.prices, "prices")?,
            self.config.week_end_day,
        )?;
        let quarterly = self.stage_one(inputs, &mut diagnostics)?;
        let daily = self.stage_two(ctx, &prices, &quarterly, &inputs.consensus, &mut diagnostics)?;
        let panel = self.finalize(ctx, &daily)?;

        info!(
            ticker = %inputs.ticker,
            rows = panel.height(),
            diagnostics = diagnostics.len(),
            "factors computed"
        );
        Ok(FactorOutput { ticker: inputs.ticker.clone(), panel, diagnostics })
    }

    fn stage_one(&self, inputs: &InputFrames, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let statements = &inputs.statements;
        frame::require_dates(statements, "statements")?;
        if !frame::has_column(statements, frame::REPORT_DATE) {
            return Err(FactorError::MissingColumn(format!("statements.{}", frame::REPORT_DATE)));
        }

        let items: Vec<&str> = LineItem::ALL.iter().map(LineItem::column).collect();
        let mut quarterly = frame::first_per_date(&frame::numeric_columns(statements, &items)?)?;
        if !frame::has_column(&quarterly, frame::TICKER) {
            quarterly = quarterly
                .lazy()
                .with_column(lit(inputs.ticker.as_str()).alias(frame::TICKER))
                .collect()?;
        }
        debug!(ticker = %inputs.ticker, quarters = quarterly.height(), "stage 1");

        let aggregated = fundamentals::aggregate(&quarterly, &self.config.fundamentals, diagnostics)?;
        let with_ratios = apply_ratios(&aggregated, self.registry.fundamental(), Stage::Ratio, diagnostics)?;

        Ok(with_ratios.lazy().with_column(lit(true).alias(frame::STATEMENT_ROW)).collect()?)
    }

    fn stage_two(
        &self,
        ctx: &RunContext,
        prices: &DataFrame,
        quarterly: &DataFrame,
        updates: &DataFrame,
        diagnostics: &mut Diagnostics,
    ) -> Result<DataFrame> {
        let updates = reconcile_consensus(updates)?;
        let consensus_daily = consensus::consensus_on_calendar(&ctx.calendar, &updates)?;
        let inputs = DailyInputs { prices, benchmark: &ctx.benchmark, consensus: &consensus_daily };

        let mut parts = vec![ctx.calendar.clone(), price_columns(prices)?, quarterly.clone()];
        for factor in self.registry.daily() {
            let missing = factor.missing_columns(&inputs);
            if !missing.is_empty() {
                let stage = match factor.input() {
                    InputSource::Prices => Stage::Price,
                    InputSource::Consensus => Stage::Consensus,
                };
                diagnostics.missing_columns(stage, factor.name(), missing);
                continue;
            }
            parts.push(factor.compute(&inputs)?);
        }
        debug!(ticker = diagnostics.ticker(), tables = parts.len(), "stage 2 merge");

        let tables: Vec<&DataFrame> = parts.iter().collect();
        let merged = frame::merge_on_dates(&tables)?
            .lazy()
            .with_column(col(frame::STATEMENT_ROW).fill_null(lit(false)))
            .collect()?;
        let filled = frame::forward_fill(&merged, &[DATE, frame::DAY_OF_WEEK, frame::STATEMENT_ROW])?;

        apply_ratios(&filled, self.registry.valuation(), Stage::Valuation, diagnostics)
    }

    fn finalize(&self, ctx: &RunContext, daily: &DataFrame) -> Result<DataFrame> {
        let start = ctx.start.to_string();
        let end = ctx.end.to_string();

        let weekly = daily
            .clone()
            .lazy()
            .filter(
                col(frame::DAY_OF_WEEK)
                    .cast(DataType::Int32)
                    .eq(lit(i32::from(self.config.week_end_day))),
            )
            .filter(col(DATE).gt_eq(lit(start.as_str())).and(col(DATE).lt_eq(lit(end.as_str()))))
            .collect()?;
        let weekly = frame::sanitize_non_finite(&weekly)?;

        let selection: Vec<Expr> = self
            .panel_columns()
            .iter()
            .map(|name| {
                let name = name.as_str();
                if name == frame::UPDATED_DT {
                    lit(end.as_str()).alias(name)
                } else if LEADING.contains(&name) {
                    if frame::has_column(&weekly, name) {
                        col(name).cast(DataType::String)
                    } else {
                        lit(NULL).cast(DataType::String).alias(name)
                    }
                } else if frame::has_column(&weekly, name) {
                    col(name).cast(DataType::Float64)
                } else {
                    frame::null_f64().alias(name)
                }
            })
            .collect();

        Ok(weekly
            .lazy()
            .select(selection)
            .filter(col(frame::TICKER).is_not_null().and(col(frame::REPORT_DATE).is_not_null()))
            .collect()?)
    }

    fn empty_panel(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .panel_columns()
            .iter()
            .map(|name| {
                if LEADING.contains(&name.as_str()) || name == frame::UPDATED_DT {
                    Series::new(name.as_str().into(), Vec::<String>::new()).into()
                } else {
                    Series::new(name.as_str().into(), Vec::<f64>::new()).into()
                }
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// Validate, cast, deduplicate and sort a price table.
fn reconcile_prices(df: &DataFrame, table: &str) -> Result<DataFrame> {
    frame::require_dates(df, table)?;
    let numeric = frame::numeric_columns(df, &frame::PRICE_COLUMNS)?;
    frame::first_per_date(&price_columns(&numeric)?)
}

/// `date` plus the price columns present in `df`.
fn price_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut selection = vec![col(DATE)];
    selection.extend(
        frame::PRICE_COLUMNS
            .iter()
            .filter(|c| frame::has_column(df, c))
            .map(|c| col(*c)),
    );
    Ok(df.clone().lazy().select(selection).collect()?)
}

fn reconcile_consensus(df: &DataFrame) -> Result<DataFrame> {
    if !frame::has_column(df, DATE) {
        return Ok(df.clone());
    }
    frame::require_dates(df, "consensus")?;
    let numeric = frame::numeric_columns(df, &[frame::TARGET_MEDIAN_PRICE])?;
    let mut selection = vec![col(DATE)];
    if frame::has_column(&numeric, frame::TARGET_MEDIAN_PRICE) {
        selection.push(col(frame::TARGET_MEDIAN_PRICE));
    }
    frame::first_per_date(&numeric.lazy().select(selection).collect()?)
}
