//! Trailing-twelve-month sums of quarterly flow items.

use crate::{Diagnostics, LineItem, Result, Stage, frame, window};
use polars::prelude::*;
use tracing::debug;

/// Sums each flow item over the trailing `window` quarters into `ttm_<item>`.
///
/// A sum is only defined when all `window` quarters are present.
#[derive(Debug, Clone)]
pub struct TrailingAggregator {
    items: Vec<LineItem>,
    window: usize,
}

impl Default for TrailingAggregator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TrailingAggregator {
    /// Aggregator over every flow item.
    pub fn new(window: usize) -> Self {
        Self { items: LineItem::FLOWS.to_vec(), window }
    }

    /// Aggregator over a custom item list.
    pub const fn with_items(items: Vec<LineItem>, window: usize) -> Self {
        Self { items, window }
    }

    /// Items aggregated.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Append `ttm_<item>` columns to the quarterly table.
    pub fn apply(&self, df: &DataFrame, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let mut exprs = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let target = item.ttm_column();
            if frame::has_column(df, item.column()) {
                exprs.push(window::rolling_sum(col(item.column()), self.window).alias(target.as_str()));
            } else {
                diagnostics.missing_columns(Stage::Trailing, item.column(), vec![item.column().to_string()]);
                exprs.push(frame::null_f64().alias(target.as_str()));
            }
        }
        debug!(ticker = diagnostics.ticker(), items = self.items.len(), window = self.window, "trailing sums");

        Ok(df.clone().lazy().with_columns(exprs).collect()?)
    }
}
