//! Price factor bank.
//!
//! Factors in this module read the security's adjusted close (and high) and,
//! for beta and risk-adjusted momentum, the benchmark's adjusted close. Each
//! returns a `date` column plus its outputs; resampled factors are labelled
//! with the period-end date and forward-filled by the engine.

pub mod beta;
pub mod returns;
pub mod risk;

pub use beta::{Beta, BetaConfig, RiskAdjustedMomentum, RiskAdjustedMomentumConfig};
pub use returns::{PriceReturn, PriceReturnConfig};
pub use risk::{
    MaxDrawdown, MaxDrawdownConfig, RelativePrice, RelativePriceConfig, Volatility, VolatilityConfig,
};

use crate::{DataFrequency, Result, frame, window};
use polars::prelude::*;

/// Security return column used while combining with the benchmark.
pub(crate) const STOCK_RETURN: &str = "stock_return";
/// Benchmark return column used while combining with the security.
pub(crate) const MARKET_RETURN: &str = "market_return";

/// Percentage change of `adj_close` after reducing `prices` to one
/// observation per period of `frequency`.
///
/// Returns `date` (the period-end label, or the trading day for daily data)
/// and `alias`.
pub fn period_returns(
    prices: &DataFrame,
    frequency: DataFrequency,
    lag: usize,
    skip: usize,
    alias: &str,
) -> Result<DataFrame> {
    let resampled = window::resample_last(prices, frequency, &[frame::ADJ_CLOSE])?;
    Ok(resampled
        .lazy()
        .select([
            col(frame::DATE),
            window::percent_change(col(frame::ADJ_CLOSE), lag, skip).alias(alias),
        ])
        .collect()?)
}
