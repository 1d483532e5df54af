//! Factor registry for discovery and introspection.
//!
//! The registry lists every factor one engine evaluates, in evaluation order,
//! split by the table each group runs on: quarterly ratios, daily price and
//! consensus factors, then daily valuation ratios. Output column names must
//! be unique across all groups.

use crate::{
    ConfigurableFactor, DailyFactor, EngineConfig, Factor, FactorError, Result,
    consensus::TargetPriceRevision,
    price::{MaxDrawdown, PriceReturn, RelativePrice, RiskAdjustedMomentum, Volatility},
    ratio::{self, RatioFactor},
    traits::DataFrequency,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

/// Factor category for grouping related factors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorCategory {
    /// Momentum - trend persistence and price location factors
    Momentum,
    /// Value - earnings and cash flow yields
    Value,
    /// Quality - profitability and efficiency factors
    Quality,
    /// Size - market capitalization
    Size,
    /// Volatility - risk and beta factors
    Volatility,
    /// Growth - growth level and stability factors
    Growth,
    /// Sentiment - analyst target price revisions
    Sentiment,
}

/// Metadata for factor introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorInfo {
    /// Factor name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factor category
    pub category: FactorCategory,
    /// Required input columns
    pub required_columns: Vec<String>,
    /// Columns written to the panel
    pub outputs: Vec<String>,
    /// Lookback period
    pub lookback: usize,
    /// Data frequency
    pub frequency: DataFrequency,
}

impl FactorInfo {
    fn of(factor: &dyn Factor) -> Self {
        Self {
            name: factor.name().to_string(),
            description: factor.description().to_string(),
            category: factor.category(),
            required_columns: factor.required_columns().to_vec(),
            outputs: factor.outputs(),
            lookback: factor.lookback(),
            frequency: factor.frequency(),
        }
    }
}

/// Registry for factor discovery and evaluation order.
#[derive(Debug, Default)]
pub struct FactorRegistry {
    fundamental: Vec<RatioFactor>,
    daily: Vec<Arc<dyn DailyFactor>>,
    valuation: Vec<RatioFactor>,
    outputs: HashSet<String>,
}

impl FactorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the default configuration.
    pub fn with_defaults() -> Self {
        let config = EngineConfig::default();
        let mut registry = Self::new();

        for ratio in ratio::fundamental_bank(&config.ratios) {
            registry.insert_outputs(&ratio);
            registry.fundamental.push(ratio);
        }
        for factor in daily_factors(&config) {
            registry.insert_outputs(factor.as_ref());
            registry.daily.push(factor);
        }
        for ratio in ratio::valuation_bank(&config.ratios) {
            registry.insert_outputs(&ratio);
            registry.valuation.push(ratio);
        }

        registry
    }

    /// Registry for `config`, rejecting output names produced twice.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut registry = Self::new();

        for ratio in ratio::fundamental_bank(&config.ratios) {
            registry.register_fundamental(ratio)?;
        }
        for factor in daily_factors(config) {
            registry.register_daily(factor)?;
        }
        for ratio in ratio::valuation_bank(&config.ratios) {
            registry.register_valuation(ratio)?;
        }

        Ok(registry)
    }

    fn insert_outputs(&mut self, factor: &dyn Factor) {
        self.outputs.extend(factor.outputs());
    }

    fn check_outputs(&self, factor: &dyn Factor) -> Result<()> {
        for output in factor.outputs() {
            if self.outputs.contains(&output) {
                return Err(FactorError::InvalidConfig(format!(
                    "output column {output} of {} is already produced by another factor",
                    factor.name()
                )));
            }
        }
        Ok(())
    }

    /// Register a ratio evaluated on the quarterly table.
    pub fn register_fundamental(&mut self, ratio: RatioFactor) -> Result<()> {
        self.check_outputs(&ratio)?;
        self.insert_outputs(&ratio);
        self.fundamental.push(ratio);
        Ok(())
    }

    /// Register a factor computed from daily inputs.
    pub fn register_daily(&mut self, factor: Arc<dyn DailyFactor>) -> Result<()> {
        self.check_outputs(factor.as_ref())?;
        self.insert_outputs(factor.as_ref());
        self.daily.push(factor);
        Ok(())
    }

    /// Register a ratio evaluated on the forward-filled daily table.
    pub fn register_valuation(&mut self, ratio: RatioFactor) -> Result<()> {
        self.check_outputs(&ratio)?;
        self.insert_outputs(&ratio);
        self.valuation.push(ratio);
        Ok(())
    }

    /// Ratios on the quarterly table, in evaluation order.
    pub fn fundamental(&self) -> &[RatioFactor] {
        &self.fundamental
    }

    /// Factors on daily inputs, in evaluation order.
    pub fn daily(&self) -> &[Arc<dyn DailyFactor>] {
        &self.daily
    }

    /// Ratios on the daily table, in evaluation order.
    pub fn valuation(&self) -> &[RatioFactor] {
        &self.valuation
    }

    /// Every factor in evaluation order.
    pub fn factors(&self) -> impl Iterator<Item = &dyn Factor> {
        self.fundamental
            .iter()
            .map(|r| r as &dyn Factor)
            .chain(self.daily.iter().map(|f| f.as_ref() as &dyn Factor))
            .chain(self.valuation.iter().map(|r| r as &dyn Factor))
    }

    /// Get a factor by name.
    pub fn get(&self, name: &str) -> Option<&dyn Factor> {
        self.factors().find(|f| f.name() == name)
    }

    /// Metadata of one factor.
    pub fn info(&self, name: &str) -> Result<FactorInfo> {
        self.get(name)
            .map(FactorInfo::of)
            .ok_or_else(|| FactorError::NotFound(name.to_string()))
    }

    /// Get factors by category.
    pub fn by_category(&self, category: FactorCategory) -> Vec<&dyn Factor> {
        self.factors().filter(|f| f.category() == category).collect()
    }

    /// Get all factor metadata.
    pub fn all_info(&self) -> Vec<FactorInfo> {
        self.factors().map(FactorInfo::of).collect()
    }

    /// Get all factor names.
    pub fn names(&self) -> Vec<&str> {
        self.factors().map(|f| f.name()).collect()
    }

    /// Every output column, in evaluation order.
    pub fn output_columns(&self) -> Vec<String> {
        self.factors().flat_map(|f| f.outputs()).collect()
    }

    /// Number of registered factors.
    pub fn len(&self) -> usize {
        self.fundamental.len() + self.daily.len() + self.valuation.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn daily_factors(config: &EngineConfig) -> Vec<Arc<dyn DailyFactor>> {
    fn boxed<F: DailyFactor + 'static>(factor: F) -> Arc<dyn DailyFactor> {
        Arc::new(factor)
    }

    let prices = &config.prices;
    let mut factors = Vec::new();

    factors.extend(prices.returns.iter().cloned().map(|c| boxed(PriceReturn::with_config(c))));
    factors.extend(
        prices
            .risk_adjusted_momentum
            .iter()
            .cloned()
            .map(|c| boxed(RiskAdjustedMomentum::with_config(c))),
    );
    factors.extend(prices.drawdown.iter().cloned().map(|c| boxed(MaxDrawdown::with_config(c))));
    factors.extend(prices.relative_price.iter().cloned().map(|c| boxed(RelativePrice::with_config(c))));
    factors.extend(prices.volatility.iter().cloned().map(|c| boxed(Volatility::with_config(c))));
    factors.extend(
        config.consensus.revisions.iter().cloned().map(|c| boxed(TargetPriceRevision::with_config(c))),
    );

    factors
}
