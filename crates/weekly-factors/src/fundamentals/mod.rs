//! Stage-1 aggregation of quarterly statements.
//!
//! Each step appends columns to the quarterly table and never removes any:
//! trailing-twelve-month sums, then their growth, then rolling dispersion of
//! that growth. A line item absent from the input produces a diagnostic and
//! all-missing columns; the remaining items are unaffected.

pub mod growth;
pub mod trailing;

pub use growth::{DispersionCalculator, GrowthCalculator};
pub use trailing::TrailingAggregator;

use crate::{Diagnostics, FundamentalConfig, Result};
use polars::prelude::DataFrame;

/// Run trailing, growth and dispersion steps in order.
pub fn aggregate(
    statements: &DataFrame,
    config: &FundamentalConfig,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let trailing = TrailingAggregator::new(config.ttm_window).apply(statements, diagnostics)?;
    let growth = GrowthCalculator::new(config.growth_shift).apply(&trailing, diagnostics)?;
    DispersionCalculator::new(config.dispersion_windows.clone()).apply(&growth, diagnostics)
}
