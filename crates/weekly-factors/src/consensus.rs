//! Analyst target price revisions.
//!
//! Consensus updates arrive irregularly. They are first carried forward onto
//! the complete daily calendar so that a lag of `n` always means `n`
//! calendar days.

use crate::{
    DataFrequency, Result,
    registry::FactorCategory,
    traits::{ConfigurableFactor, DailyFactor, DailyInputs, Factor, InputSource},
    frame, window,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Place consensus updates on the calendar and forward-fill them.
///
/// The result holds every calendar date (plus any consensus date outside
/// it) and, when present, the `target_median_price` column.
pub fn consensus_on_calendar(calendar: &DataFrame, consensus: &DataFrame) -> Result<DataFrame> {
    let dates = calendar.clone().lazy().select([col(frame::DATE)]).collect()?;
    if !frame::has_column(consensus, frame::DATE) {
        return Ok(dates);
    }
    let merged = frame::merge_on_dates(&[&dates, consensus])?;
    frame::forward_fill(&merged, &[frame::DATE])
}

/// Configuration for the target price revision factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPriceRevisionConfig {
    /// Days between the two target prices (default: 21)
    pub lag: usize,
}

impl Default for TargetPriceRevisionConfig {
    fn default() -> Self {
        Self { lag: 21 }
    }
}

/// Change of the median analyst target price over `lag` days.
///
/// Formula: `target / target.shift(lag) - 1` on the forward-filled daily
/// consensus. Days without a value are dropped from the result. Output
/// `tparev<lag>d`.
#[derive(Debug, Clone)]
pub struct TargetPriceRevision {
    config: TargetPriceRevisionConfig,
    name: String,
    required: Vec<String>,
}

impl Default for TargetPriceRevision {
    fn default() -> Self {
        Self::with_config(TargetPriceRevisionConfig::default())
    }
}

impl ConfigurableFactor for TargetPriceRevision {
    type Config = TargetPriceRevisionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("tparev{}d", config.lag),
            config,
            required: vec![frame::TARGET_MEDIAN_PRICE.to_string()],
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for TargetPriceRevision {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Percentage revision of the median analyst target price"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Sentiment
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.lag
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }
}

impl DailyFactor for TargetPriceRevision {
    fn input(&self) -> InputSource {
        InputSource::Consensus
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let name = self.name.as_str();
        Ok(inputs
            .consensus
            .clone()
            .lazy()
            .select([
                col(frame::DATE),
                window::percent_change(col(frame::TARGET_MEDIAN_PRICE), self.config.lag, 0).alias(name),
            ])
            .filter(col(name).is_not_null())
            .collect()?)
    }
}
