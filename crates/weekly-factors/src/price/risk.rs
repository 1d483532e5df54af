//! Drawdown, relative price and return volatility.

use super::period_returns;
use crate::{
    DataFrequency, Result,
    registry::FactorCategory,
    traits::{ConfigurableFactor, DailyFactor, DailyInputs, Factor, InputSource},
    frame, window,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the drawdown factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxDrawdownConfig {
    /// Trading days in the rolling high (default: 252)
    pub window: usize,
}

impl Default for MaxDrawdownConfig {
    fn default() -> Self {
        Self { window: 252 }
    }
}

/// Distance of adjusted close below the rolling maximum of the daily high.
///
/// Formula: `adj_close / max(high, window) - 1`. Output `pcghi<window>d`.
#[derive(Debug, Clone)]
pub struct MaxDrawdown {
    config: MaxDrawdownConfig,
    name: String,
    required: Vec<String>,
}

impl Default for MaxDrawdown {
    fn default() -> Self {
        Self::with_config(MaxDrawdownConfig::default())
    }
}

impl ConfigurableFactor for MaxDrawdown {
    type Config = MaxDrawdownConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("pcghi{}d", config.window),
            config,
            required: vec![frame::ADJ_CLOSE.to_string(), frame::HIGH.to_string()],
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for MaxDrawdown {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Adjusted close relative to the rolling high"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Momentum
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.window
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }
}

impl DailyFactor for MaxDrawdown {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let high = window::rolling_max(col(frame::HIGH), self.config.window);
        Ok(inputs
            .prices
            .clone()
            .lazy()
            .select([
                col(frame::DATE),
                (col(frame::ADJ_CLOSE) / high - lit(1.0)).alias(self.name.as_str()),
            ])
            .collect()?)
    }
}

/// Configuration for the relative price factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativePriceConfig {
    /// Trading days in the rolling mean (default: 10)
    pub window: usize,
}

impl Default for RelativePriceConfig {
    fn default() -> Self {
        Self { window: 10 }
    }
}

/// Adjusted close over its rolling mean. Output `rp<window>d`.
#[derive(Debug, Clone)]
pub struct RelativePrice {
    config: RelativePriceConfig,
    name: String,
    required: Vec<String>,
}

impl Default for RelativePrice {
    fn default() -> Self {
        Self::with_config(RelativePriceConfig::default())
    }
}

impl ConfigurableFactor for RelativePrice {
    type Config = RelativePriceConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("rp{}d", config.window),
            config,
            required: vec![frame::ADJ_CLOSE.to_string()],
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for RelativePrice {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Adjusted close relative to its short rolling mean"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Momentum
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.window
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }
}

impl DailyFactor for RelativePrice {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let mean = window::rolling_mean(col(frame::ADJ_CLOSE), self.config.window);
        Ok(inputs
            .prices
            .clone()
            .lazy()
            .select([col(frame::DATE), (col(frame::ADJ_CLOSE) / mean).alias(self.name.as_str())])
            .collect()?)
    }
}

/// Configuration for the volatility factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityConfig {
    /// Returns in the rolling window (default: 60)
    pub window: usize,
    /// Frequency of the returns (default: daily)
    pub frequency: DataFrequency,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self { window: 60, frequency: DataFrequency::Daily }
    }
}

/// Sample standard deviation of one-period returns at a frequency.
///
/// Not annualised. Output `volatility<window><f>`, e.g. `volatility60d`.
#[derive(Debug, Clone)]
pub struct Volatility {
    config: VolatilityConfig,
    name: String,
    required: Vec<String>,
}

impl Default for Volatility {
    fn default() -> Self {
        Self::with_config(VolatilityConfig::default())
    }
}

impl ConfigurableFactor for Volatility {
    type Config = VolatilityConfig;

    fn with_config(config: Self::Config) -> Self {
        Self {
            name: format!("volatility{}{}", config.window, config.frequency.suffix()),
            config,
            required: vec![frame::ADJ_CLOSE.to_string()],
        }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for Volatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Rolling standard deviation of periodic returns"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Volatility
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.window
    }

    fn frequency(&self) -> DataFrequency {
        self.config.frequency
    }
}

impl DailyFactor for Volatility {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let returns = period_returns(inputs.prices, self.config.frequency, 1, 0, self.name.as_str())?;
        Ok(returns
            .lazy()
            .select([
                col(frame::DATE),
                window::rolling_stdev(col(self.name.as_str()), self.config.window).alias(self.name.as_str()),
            ])
            .collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn inputs_for(prices: &[f64]) -> DataFrame {
        let dates = fixtures::trading_days(fixtures::ymd(2024, 1, 1), prices.len());
        fixtures::price_table(&dates, prices)
    }

    #[rstest]
    #[case(MaxDrawdown::default().name().to_string(), "pcghi252d")]
    #[case(RelativePrice::default().name().to_string(), "rp10d")]
    #[case(Volatility::default().name().to_string(), "volatility60d")]
    #[case(
        Volatility::with_config(VolatilityConfig { window: 12, frequency: DataFrequency::Monthly })
            .name()
            .to_string(),
        "volatility12m"
    )]
    fn test_names(#[case] name: String, #[case] expected: &str) {
        assert_eq!(name, expected);
    }

    #[test]
    fn test_drawdown_from_rolling_high() {
        let prices = inputs_for(&[100.0, 120.0, 90.0, 60.0]);
        let empty = DataFrame::empty();
        let inputs = DailyInputs { prices: &prices, benchmark: &prices, consensus: &empty };

        let factor = MaxDrawdown::with_config(MaxDrawdownConfig { window: 3 });
        let values = frame::f64_values(&factor.compute(&inputs).unwrap(), "pcghi3d").unwrap();

        // fixture highs sit 1% above the close
        assert_eq!(values[1], None);
        assert_relative_eq!(values[2].unwrap(), 90.0 / 121.2 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(values[3].unwrap(), 60.0 / 121.2 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_price() {
        let prices = inputs_for(&[10.0, 20.0, 30.0]);
        let empty = DataFrame::empty();
        let inputs = DailyInputs { prices: &prices, benchmark: &prices, consensus: &empty };

        let factor = RelativePrice::with_config(RelativePriceConfig { window: 3 });
        let values = frame::f64_values(&factor.compute(&inputs).unwrap(), "rp3d").unwrap();

        assert_eq!(values[..2], [None, None]);
        assert_relative_eq!(values[2].unwrap(), 1.5);
    }

    #[test]
    fn test_volatility_of_alternating_returns() {
        // returns +10%, -10%, +10%, -10%, +10%
        let mut prices = vec![100.0];
        for i in 0..5 {
            let step = if i % 2 == 0 { 1.1 } else { 0.9 };
            prices.push(prices[i] * step);
        }
        let table = inputs_for(&prices);
        let empty = DataFrame::empty();
        let inputs = DailyInputs { prices: &table, benchmark: &table, consensus: &empty };

        let factor = Volatility::with_config(VolatilityConfig { window: 5, frequency: DataFrequency::Daily });
        let values = frame::f64_values(&factor.compute(&inputs).unwrap(), "volatility5d").unwrap();

        assert_eq!(values[4], None);
        assert_relative_eq!(values[5].unwrap(), 0.012_f64.sqrt(), epsilon = 1e-9);
    }
}
