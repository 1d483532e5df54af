//! Growth of trailing figures and its rolling dispersion.

use crate::{Diagnostics, LineItem, Result, Stage, frame, window};
use polars::prelude::*;
use tracing::debug;

/// `growth_<item> = ttm / |ttm.shift(shift)| - 1`.
///
/// The absolute value keeps the sign of growth meaningful when the base
/// period was a loss.
#[derive(Debug, Clone)]
pub struct GrowthCalculator {
    items: Vec<LineItem>,
    shift: usize,
}

impl Default for GrowthCalculator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl GrowthCalculator {
    /// Growth over every flow item.
    pub fn new(shift: usize) -> Self {
        Self { items: LineItem::FLOWS.to_vec(), shift }
    }

    /// Growth over a custom item list.
    pub const fn with_items(items: Vec<LineItem>, shift: usize) -> Self {
        Self { items, shift }
    }

    /// Append `growth_<item>` columns.
    pub fn apply(&self, df: &DataFrame, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let mut exprs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let source = item.ttm_column();
            let target = item.growth_column();
            if frame::has_column(df, &source) {
                let base = col(source.as_str()).shift(lit(self.shift as i64)).abs();
                exprs.push((col(source.as_str()) / base - lit(1.0)).alias(target.as_str()));
            } else {
                diagnostics.missing_columns(Stage::Growth, item.column(), vec![source]);
                exprs.push(frame::null_f64().alias(target.as_str()));
            }
        }
        debug!(ticker = diagnostics.ticker(), shift = self.shift, "growth");

        Ok(df.clone().lazy().with_columns(exprs).collect()?)
    }
}

/// Rolling median and standard deviation of each growth series, one pair of
/// columns per window.
#[derive(Debug, Clone)]
pub struct DispersionCalculator {
    items: Vec<LineItem>,
    windows: Vec<usize>,
}

impl Default for DispersionCalculator {
    fn default() -> Self {
        Self::new(vec![8, 12])
    }
}

impl DispersionCalculator {
    /// Dispersion over every flow item.
    pub fn new(windows: Vec<usize>) -> Self {
        Self { items: LineItem::FLOWS.to_vec(), windows }
    }

    /// Dispersion over a custom item list.
    pub const fn with_items(items: Vec<LineItem>, windows: Vec<usize>) -> Self {
        Self { items, windows }
    }

    /// Append `median_growth_<n>q_<item>` and `stdev_growth_<n>q_<item>`.
    pub fn apply(&self, df: &DataFrame, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let mut exprs = Vec::with_capacity(self.items.len() * self.windows.len() * 2);
        for item in &self.items {
            let source = item.growth_column();
            let present = frame::has_column(df, &source);
            if !present {
                diagnostics.missing_columns(Stage::Dispersion, item.column(), vec![source.clone()]);
            }
            for &n in &self.windows {
                let median = item.median_growth_column(n);
                let stdev = item.stdev_growth_column(n);
                if present {
                    exprs.push(window::rolling_median(col(source.as_str()), n).alias(median.as_str()));
                    exprs.push(window::rolling_stdev(col(source.as_str()), n).alias(stdev.as_str()));
                } else {
                    exprs.push(frame::null_f64().alias(median.as_str()));
                    exprs.push(frame::null_f64().alias(stdev.as_str()));
                }
            }
        }
        debug!(ticker = diagnostics.ticker(), windows = ?self.windows, "growth dispersion");

        if exprs.is_empty() {
            return Ok(df.clone());
        }
        Ok(df.clone().lazy().with_columns(exprs).collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_growth_uses_absolute_base() {
        let df = df![
            "ttm_net_income" => [-200.0, -150.0, -50.0, 10.0, 50.0],
        ]
        .unwrap();
        let mut diagnostics = Diagnostics::new("TEST");

        let result = GrowthCalculator::with_items(vec![LineItem::NetIncome], 4)
            .apply(&df, &mut diagnostics)
            .unwrap();

        let growth = frame::f64_values(&result, "growth_net_income").unwrap();
        assert_eq!(growth[3], None);
        assert_relative_eq!(growth[4].unwrap(), -0.75);
    }

    #[test]
    fn test_growth_reports_missing_ttm() {
        let df = df!["date" => ["2024-03-31"]].unwrap();
        let mut diagnostics = Diagnostics::new("TEST");

        let result = GrowthCalculator::with_items(vec![LineItem::Revenue], 4)
            .apply(&df, &mut diagnostics)
            .unwrap();

        assert_eq!(frame::f64_values(&result, "growth_revenue").unwrap(), vec![None]);
        assert_eq!(diagnostics.entries()[0].stage, Stage::Growth);
    }

    #[test]
    fn test_dispersion_needs_full_window() {
        let growth: Vec<Option<f64>> =
            vec![None, Some(0.1), Some(0.3), Some(0.2), Some(0.4), None, Some(0.5)];
        let df = df!["growth_revenue" => growth].unwrap();
        let mut diagnostics = Diagnostics::new("TEST");

        let result = DispersionCalculator::with_items(vec![LineItem::Revenue], vec![3])
            .apply(&df, &mut diagnostics)
            .unwrap();

        let median = frame::f64_values(&result, "median_growth_3q_revenue").unwrap();
        assert_eq!(median[2], None);
        assert_relative_eq!(median[3].unwrap(), 0.2);
        assert_relative_eq!(median[4].unwrap(), 0.3);
        // a missing quarter breaks the next three windows
        assert_eq!(median[5], None);
        assert_eq!(median[6], None);

        let stdev = frame::f64_values(&result, "stdev_growth_3q_revenue").unwrap();
        assert_relative_eq!(stdev[3].unwrap(), 0.1, epsilon = 1e-12);
        assert!(diagnostics.is_empty());
    }
}
