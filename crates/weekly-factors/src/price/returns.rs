//! Plain price return over a lag with an optional skip.

use super::period_returns;
use crate::{
    DataFrequency, Result,
    registry::FactorCategory,
    traits::{ConfigurableFactor, DailyFactor, DailyInputs, Factor, InputSource},
    frame,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the price return factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReturnConfig {
    /// Periods between the two prices (default: 63)
    pub lag: usize,
    /// Most recent periods excluded (default: 0)
    pub skip: usize,
    /// Frequency prices are resampled to first (default: daily)
    pub frequency: DataFrequency,
}

impl Default for PriceReturnConfig {
    fn default() -> Self {
        Self { lag: 63, skip: 0, frequency: DataFrequency::Daily }
    }
}

/// Price return `P[t - skip] / P[t - skip - lag] - 1` on adjusted close.
///
/// Output column `pch<lag>x<skip><f>`, e.g. `pch63x0d`.
#[derive(Debug, Clone)]
pub struct PriceReturn {
    config: PriceReturnConfig,
    name: String,
    required: Vec<String>,
}

impl Default for PriceReturn {
    fn default() -> Self {
        Self::with_config(PriceReturnConfig::default())
    }
}

impl ConfigurableFactor for PriceReturn {
    type Config = PriceReturnConfig;

    fn with_config(config: Self::Config) -> Self {
        let name = format!("pch{}x{}{}", config.lag, config.skip, config.frequency.suffix());
        Self { config, name, required: vec![frame::ADJ_CLOSE.to_string()] }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for PriceReturn {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Percentage change of adjusted close over a lag, skipping the most recent periods"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Momentum
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.lag + self.config.skip
    }

    fn frequency(&self) -> DataFrequency {
        self.config.frequency
    }
}

impl DailyFactor for PriceReturn {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        period_returns(inputs.prices, self.config.frequency, self.config.lag, self.config.skip, &self.name)
    }
}
