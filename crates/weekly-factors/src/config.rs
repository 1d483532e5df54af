//! Engine configuration.
//!
//! Defaults reproduce the production weekly job. Every section deserializes
//! from partial JSON, missing fields falling back to their defaults.

use crate::{
    DataFrequency, FactorError, Result,
    consensus::TargetPriceRevisionConfig,
    price::{
        BetaConfig, MaxDrawdownConfig, PriceReturnConfig, RelativePriceConfig,
        RiskAdjustedMomentumConfig, VolatilityConfig,
    },
};
use serde::{Deserialize, Serialize};

/// Sunday, with Monday = 0.
pub const DEFAULT_WEEK_END_DAY: u8 = 6;

/// Complete configuration of a [`FactorEngine`](crate::FactorEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Day of week kept in the output, Monday = 0 through Sunday = 6
    pub week_end_day: u8,
    /// Stage-1 aggregation
    pub fundamentals: FundamentalConfig,
    /// Ratio parameters
    pub ratios: RatioConfig,
    /// Price factors
    pub prices: PriceConfig,
    /// Consensus revisions
    pub consensus: ConsensusConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            week_end_day: DEFAULT_WEEK_END_DAY,
            fundamentals: FundamentalConfig::default(),
            ratios: RatioConfig::default(),
            prices: PriceConfig::default(),
            consensus: ConsensusConfig::default(),
        }
    }
}

/// Trailing, growth and dispersion parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalConfig {
    /// Quarters summed into a trailing figure (default: 4)
    pub ttm_window: usize,
    /// Quarters between a trailing figure and its growth base (default: 4)
    pub growth_shift: usize,
    /// Quarter windows for the median and stdev of growth (default: 8, 12)
    pub dispersion_windows: Vec<usize>,
}

impl Default for FundamentalConfig {
    fn default() -> Self {
        Self { ttm_window: 4, growth_shift: 4, dispersion_windows: vec![8, 12] }
    }
}

/// Ratio bank parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioConfig {
    /// Quarters between the two revenue figures of `qsm` (default: 4)
    pub qsm_shift: usize,
    /// Growth window of `eg` (default: 8)
    pub eg_window: usize,
    /// Growth window of `sg` (default: 12)
    pub sg_window: usize,
    /// Quarters counted by `posqeps` (default: 12)
    pub positive_eps_window: usize,
    /// Years projected by the forward earnings yield (default: 3)
    pub forward_yield_years: usize,
    /// Statement dates averaged by the average earnings yield (default: 16)
    pub average_yield_quarters: usize,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            qsm_shift: 4,
            eg_window: 8,
            sg_window: 12,
            positive_eps_window: 12,
            forward_yield_years: 3,
            average_yield_quarters: 16,
        }
    }
}

impl RatioConfig {
    /// Growth window feeding the forward earnings yield.
    pub const fn forward_yield_quarters(&self) -> usize {
        self.forward_yield_years * 4
    }
}

/// Price factor parameters. Each entry yields one factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Plain returns
    pub returns: Vec<PriceReturnConfig>,
    /// Risk-adjusted momentum
    pub risk_adjusted_momentum: Vec<RiskAdjustedMomentumConfig>,
    /// Drawdown from the rolling high
    pub drawdown: Vec<MaxDrawdownConfig>,
    /// Price relative to its rolling mean
    pub relative_price: Vec<RelativePriceConfig>,
    /// Return volatility
    pub volatility: Vec<VolatilityConfig>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        let beta = BetaConfig::default();
        let ram = |lag, skip, keep_beta| RiskAdjustedMomentumConfig { lag, skip, keep_beta, beta: beta.clone() };
        Self {
            returns: vec![PriceReturnConfig { lag: 63, skip: 0, frequency: DataFrequency::Daily }],
            risk_adjusted_momentum: vec![
                ram(126, 21, false),
                ram(189, 21, false),
                ram(252, 21, false),
                ram(21, 0, true),
            ],
            drawdown: vec![MaxDrawdownConfig { window: 252 }],
            relative_price: vec![RelativePriceConfig { window: 10 }],
            volatility: vec![
                VolatilityConfig { window: 60, frequency: DataFrequency::Daily },
                VolatilityConfig { window: 252, frequency: DataFrequency::Daily },
            ],
        }
    }
}

/// Consensus revision parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Revisions, one per lag in days (default: 21, 63, 126)
    pub revisions: Vec<TargetPriceRevisionConfig>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            revisions: [21, 63, 126].into_iter().map(|lag| TargetPriceRevisionConfig { lag }).collect(),
        }
    }
}

fn positive(value: usize, what: &str) -> Result<()> {
    if value == 0 {
        return Err(FactorError::InvalidConfig(format!("{what} must be positive")));
    }
    Ok(())
}

fn at_least_two(value: usize, what: &str) -> Result<()> {
    if value < 2 {
        return Err(FactorError::InvalidConfig(format!("{what} must be at least 2, got {value}")));
    }
    Ok(())
}

impl EngineConfig {
    /// Check parameters before any run.
    ///
    /// Ratios that read a growth dispersion window must find it among
    /// [`FundamentalConfig::dispersion_windows`].
    pub fn validate(&self) -> Result<()> {
        if self.week_end_day > 6 {
            return Err(FactorError::InvalidConfig(format!(
                "week_end_day must be 0..=6, got {}",
                self.week_end_day
            )));
        }

        let fundamentals = &self.fundamentals;
        positive(fundamentals.ttm_window, "fundamentals.ttm_window")?;
        positive(fundamentals.growth_shift, "fundamentals.growth_shift")?;
        for &window in &fundamentals.dispersion_windows {
            at_least_two(window, "fundamentals.dispersion_windows")?;
        }

        let ratios = &self.ratios;
        positive(ratios.qsm_shift, "ratios.qsm_shift")?;
        positive(ratios.positive_eps_window, "ratios.positive_eps_window")?;
        positive(ratios.forward_yield_years, "ratios.forward_yield_years")?;
        positive(ratios.average_yield_quarters, "ratios.average_yield_quarters")?;
        for (what, window) in [
            ("ratios.eg_window", ratios.eg_window),
            ("ratios.sg_window", ratios.sg_window),
            ("ratios.forward_yield_years * 4", ratios.forward_yield_quarters()),
        ] {
            if !fundamentals.dispersion_windows.contains(&window) {
                return Err(FactorError::InvalidConfig(format!(
                    "{what} = {window} is not one of the dispersion windows {:?}",
                    fundamentals.dispersion_windows
                )));
            }
        }

        let prices = &self.prices;
        for r in &prices.returns {
            positive(r.lag, "prices.returns.lag")?;
        }
        for ram in &prices.risk_adjusted_momentum {
            positive(ram.lag, "prices.risk_adjusted_momentum.lag")?;
            at_least_two(ram.beta.length, "prices.risk_adjusted_momentum.beta.length")?;
        }
        for d in &prices.drawdown {
            positive(d.window, "prices.drawdown.window")?;
        }
        for rp in &prices.relative_price {
            positive(rp.window, "prices.relative_price.window")?;
        }
        for v in &prices.volatility {
            at_least_two(v.window, "prices.volatility.window")?;
        }

        for revision in &self.consensus.revisions {
            positive(revision.lag, "consensus.revisions.lag")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.week_end_day, 6);
        assert_eq!(config.fundamentals.dispersion_windows, vec![8, 12]);
        assert_eq!(config.prices.risk_adjusted_momentum.len(), 4);
        assert_eq!(config.ratios.forward_yield_quarters(), 12);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"week_end_day": 4, "ratios": {"eg_window": 12}}"#).unwrap();

        assert_eq!(config.week_end_day, 4);
        assert_eq!(config.ratios.eg_window, 12);
        assert_eq!(config.ratios.sg_window, 12);
        assert_eq!(config.consensus, ConsensusConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_week_end_day() {
        let config = EngineConfig { week_end_day: 7, ..Default::default() };
        assert!(matches!(config.validate(), Err(FactorError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_requires_dispersion_window() {
        let mut config = EngineConfig::default();
        config.ratios.eg_window = 6;
        assert!(matches!(config.validate(), Err(FactorError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_lag() {
        let mut config = EngineConfig::default();
        config.consensus.revisions[0].lag = 0;
        assert!(matches!(config.validate(), Err(FactorError::InvalidConfig(_))));
    }
}
