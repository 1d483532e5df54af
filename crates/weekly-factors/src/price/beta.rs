//! Market beta and risk-adjusted momentum.
//!
//! Beta measures the sensitivity of the security's periodic return to the
//! benchmark's: `β = Cov(R_i, R_m) / Var(R_m)` over a rolling window of
//! resampled returns.
//!
//! Risk-adjusted momentum strips the beta-explained part from a daily return:
//! `RAM = R_i - β × R_m`, with the beta of each row's period joined onto the
//! daily rows and forward-filled.

use super::{MARKET_RETURN, STOCK_RETURN, period_returns};
use crate::{
    DataFrequency, Result,
    registry::FactorCategory,
    traits::{ConfigurableFactor, DailyFactor, DailyInputs, Factor, InputSource},
    frame, window,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the beta factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetaConfig {
    /// Number of resampled returns in the rolling window (default: 60)
    pub length: usize,
    /// Resampling frequency (default: monthly)
    pub frequency: DataFrequency,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self { length: 60, frequency: DataFrequency::Monthly }
    }
}

impl BetaConfig {
    /// Output column, e.g. `beta_60m`.
    pub fn column(&self) -> String {
        format!("beta_{}{}", self.length, self.frequency.suffix())
    }
}

fn benchmark_missing(required: &[String], inputs: &DailyInputs<'_>) -> Vec<String> {
    let mut missing = frame::missing_columns(inputs.prices, required);
    missing.extend(
        frame::missing_columns(inputs.benchmark, required)
            .into_iter()
            .map(|c| format!("benchmark.{c}")),
    );
    missing
}

/// Rolling beta of security returns on benchmark returns.
///
/// Output `date` is the period-end label of `frequency`.
#[derive(Debug, Clone)]
pub struct Beta {
    config: BetaConfig,
    name: String,
    required: Vec<String>,
}

impl Default for Beta {
    fn default() -> Self {
        Self::with_config(BetaConfig::default())
    }
}

impl ConfigurableFactor for Beta {
    type Config = BetaConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { name: config.column(), config, required: vec![frame::ADJ_CLOSE.to_string()] }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for Beta {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Rolling covariance of security and benchmark returns over benchmark variance"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Volatility
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn lookback(&self) -> usize {
        self.config.length
    }

    fn frequency(&self) -> DataFrequency {
        self.config.frequency
    }
}

impl DailyFactor for Beta {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn missing_columns(&self, inputs: &DailyInputs<'_>) -> Vec<String> {
        benchmark_missing(&self.required, inputs)
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let frequency = self.config.frequency;
        let length = self.config.length;
        let stock = period_returns(inputs.prices, frequency, 1, 0, STOCK_RETURN)?;
        let market = period_returns(inputs.benchmark, frequency, 1, 0, MARKET_RETURN)?;

        let beta = window::rolling_covariance(col(STOCK_RETURN), col(MARKET_RETURN), length)
            / window::rolling_variance(col(MARKET_RETURN), length);

        Ok(stock
            .lazy()
            .join(market.lazy(), [col(frame::DATE)], [col(frame::DATE)], JoinArgs::new(JoinType::Left))
            .sort([frame::DATE], SortMultipleOptions::default().with_maintain_order(true))
            .select([col(frame::DATE), beta.alias(self.name.as_str())])
            .collect()?)
    }
}

/// Configuration for the risk-adjusted momentum factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAdjustedMomentumConfig {
    /// Trading days between the two prices
    pub lag: usize,
    /// Most recent trading days excluded
    pub skip: usize,
    /// Whether the joined beta is emitted as well
    pub keep_beta: bool,
    /// Beta the benchmark return is scaled by
    pub beta: BetaConfig,
}

impl Default for RiskAdjustedMomentumConfig {
    fn default() -> Self {
        Self { lag: 21, skip: 0, keep_beta: true, beta: BetaConfig::default() }
    }
}

/// Daily return in excess of the beta-scaled benchmark return.
///
/// Output column `ram<lag>x<skip>d`, plus the beta column when
/// [`RiskAdjustedMomentumConfig::keep_beta`] is set.
#[derive(Debug, Clone)]
pub struct RiskAdjustedMomentum {
    config: RiskAdjustedMomentumConfig,
    name: String,
    required: Vec<String>,
}

impl Default for RiskAdjustedMomentum {
    fn default() -> Self {
        Self::with_config(RiskAdjustedMomentumConfig::default())
    }
}

impl ConfigurableFactor for RiskAdjustedMomentum {
    type Config = RiskAdjustedMomentumConfig;

    fn with_config(config: Self::Config) -> Self {
        let name = format!("ram{}x{}d", config.lag, config.skip);
        Self { config, name, required: vec![frame::ADJ_CLOSE.to_string()] }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Factor for RiskAdjustedMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Security return minus beta times benchmark return"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Momentum
    }

    fn required_columns(&self) -> &[String] {
        &self.required
    }

    fn outputs(&self) -> Vec<String> {
        let mut outputs = vec![self.name.clone()];
        if self.config.keep_beta {
            outputs.push(self.config.beta.column());
        }
        outputs
    }

    fn lookback(&self) -> usize {
        self.config.lag + self.config.skip
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }
}

impl DailyFactor for RiskAdjustedMomentum {
    fn input(&self) -> InputSource {
        InputSource::Prices
    }

    fn missing_columns(&self, inputs: &DailyInputs<'_>) -> Vec<String> {
        benchmark_missing(&self.required, inputs)
    }

    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame> {
        let beta_name = self.config.beta.column();
        let beta = Beta::with_config(self.config.beta.clone()).compute(inputs)?;
        let key = self.config.beta.frequency.period_column().unwrap_or(frame::DATE);

        let mut selection = vec![
            col(frame::DATE),
            window::percent_change(col(frame::ADJ_CLOSE), self.config.lag, self.config.skip)
                .alias(STOCK_RETURN),
        ];
        if key != frame::DATE {
            selection.push(col(key));
        }
        let stock = inputs.prices.clone().lazy().select(selection);
        let market = period_returns(
            inputs.benchmark,
            DataFrequency::Daily,
            self.config.lag,
            self.config.skip,
            MARKET_RETURN,
        )?;
        let beta = beta.lazy().select([col(frame::DATE).alias(key), col(beta_name.as_str())]);

        let mut outputs = vec![
            col(frame::DATE),
            (col(STOCK_RETURN) - col(MARKET_RETURN) * col(beta_name.as_str())).alias(self.name.as_str()),
        ];
        if self.config.keep_beta {
            outputs.push(col(beta_name.as_str()));
        }

        Ok(stock
            .join(market.lazy(), [col(frame::DATE)], [col(frame::DATE)], JoinArgs::new(JoinType::Left))
            .join(beta, [col(key)], [col(key)], JoinArgs::new(JoinType::Left))
            .sort([frame::DATE], SortMultipleOptions::default().with_maintain_order(true))
            .with_column(col(beta_name.as_str()).forward_fill(None))
            .select(outputs)
            .collect()?)
    }
}
