//! Declarative ratio bank.
//!
//! A ratio is a name, the columns it reads and a polars expression. The
//! bank is applied by one loop that performs the missing-input guard for
//! every ratio, so a ratio whose inputs are absent yields an all-missing
//! column and a diagnostic without affecting the others.
//!
//! Two banks exist: [`fundamental_bank`] runs on the quarterly table after
//! stage-1 aggregation, [`valuation_bank`] on the forward-filled daily table
//! once prices and fundamentals share a calendar.

pub mod growth;
pub mod quality;
pub mod value;

use crate::{
    DataFrequency, Diagnostics, Factor, FactorCategory, RatioConfig, Result, Stage, frame,
};
use polars::prelude::*;
use tracing::debug;

/// A named ratio over columns of one table.
#[derive(Debug, Clone)]
pub struct RatioFactor {
    name: String,
    description: String,
    category: FactorCategory,
    required: Vec<String>,
    formula: Expr,
    lookback: usize,
    frequency: DataFrequency,
    sampled_on: Option<&'static str>,
}

impl RatioFactor {
    /// Ratio evaluated on every row of its table.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: FactorCategory,
        required: Vec<String>,
        formula: Expr,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            required,
            formula,
            lookback: 1,
            frequency: DataFrequency::Quarterly,
            sampled_on: None,
        }
    }

    /// Set the number of periods the formula looks back over.
    #[must_use]
    pub const fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Set the frequency of the table the formula runs on.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: DataFrequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Evaluate only on rows where boolean column `mask` is true, then
    /// forward-fill the result over the remaining rows.
    #[must_use]
    pub const fn sampled_on(mut self, mask: &'static str) -> Self {
        self.sampled_on = Some(mask);
        self
    }

    /// Expression producing the ratio.
    pub const fn formula(&self) -> &Expr {
        &self.formula
    }

    /// Required columns absent from `df`.
    pub fn missing_columns(&self, df: &DataFrame) -> Vec<String> {
        let mut missing = frame::missing_columns(df, &self.required);
        if let Some(mask) = self.sampled_on
            && !frame::has_column(df, mask)
        {
            missing.push(mask.to_string());
        }
        missing
    }

    /// Append the ratio column to `df`.
    ///
    /// Missing inputs yield an all-missing column plus a diagnostic.
    pub fn apply(&self, df: &DataFrame, stage: Stage, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let name = self.name.as_str();
        let missing = self.missing_columns(df);
        if !missing.is_empty() {
            diagnostics.missing_columns(stage, name, missing);
            return Ok(df.clone().lazy().with_column(frame::null_f64().alias(name)).collect()?);
        }

        let Some(mask) = self.sampled_on else {
            return Ok(df.clone().lazy().with_column(self.formula.clone().alias(name)).collect()?);
        };

        let sampled = df
            .clone()
            .lazy()
            .filter(col(mask))
            .select([col(frame::DATE), self.formula.clone().alias(name)]);
        Ok(df
            .clone()
            .lazy()
            .join(sampled, [col(frame::DATE)], [col(frame::DATE)], JoinArgs::new(JoinType::Left))
            .sort([frame::DATE], SortMultipleOptions::default().with_maintain_order(true))
            .with_column(col(name).forward_fill(None))
            .collect()?)
    }
}

impl Factor for RatioFactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> FactorCategory {
        self.category
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn frequency(&self) -> DataFrequency {
        self.frequency
    }
}

/// Apply `ratios` in order, each seeing the columns of those before it.
pub fn apply_ratios(
    df: &DataFrame,
    ratios: &[RatioFactor],
    stage: Stage,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let mut out = df.clone();
    for ratio in ratios {
        out = ratio.apply(&out, stage, diagnostics)?;
    }
    debug!(ticker = diagnostics.ticker(), stage = %stage, ratios = ratios.len(), "ratios applied");
    Ok(out)
}

/// Ratios evaluated on the quarterly table.
pub fn fundamental_bank(config: &RatioConfig) -> Vec<RatioFactor> {
    let mut bank = quality::ratios();
    bank.extend(growth::ratios(config));
    bank
}

/// Ratios evaluated on the daily table, market capitalisation first.
pub fn valuation_bank(config: &RatioConfig) -> Vec<RatioFactor> {
    value::ratios(config)
}

pub(crate) fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}
