//! Growth stability and earnings consistency ratios.

use super::{RatioFactor, columns};
use crate::{FactorCategory, LineItem, RatioConfig, window};
use polars::prelude::*;

fn stability(name: String, description: &str, item: LineItem, window: usize) -> RatioFactor {
    let median = item.median_growth_column(window);
    let stdev = item.stdev_growth_column(window);
    RatioFactor::new(
        name,
        description,
        FactorCategory::Growth,
        columns(&[&median, &stdev]),
        col(median.as_str()) / col(stdev.as_str()),
    )
    .with_lookback(window)
}

/// `qsm_<k>q`, `eg<n>q`, `sg<n>q`, `posqeps_<n>qcount`.
pub fn ratios(config: &RatioConfig) -> Vec<RatioFactor> {
    let revenue = LineItem::Revenue.ttm_column();
    let eps = LineItem::DilutedEps.column();
    let positive = when(col(eps).gt(lit(0.0))).then(lit(1.0)).otherwise(lit(0.0));

    vec![
        RatioFactor::new(
            format!("qsm_{}q", config.qsm_shift),
            "Trailing revenue over trailing revenue k quarters earlier",
            FactorCategory::Growth,
            columns(&[&revenue]),
            col(revenue.as_str()) / col(revenue.as_str()).shift(lit(config.qsm_shift as i64)),
        )
        .with_lookback(config.qsm_shift),
        stability(
            format!("eg{}q", config.eg_window),
            "Median net income growth over its standard deviation",
            LineItem::NetIncome,
            config.eg_window,
        ),
        stability(
            format!("sg{}q", config.sg_window),
            "Median revenue growth over its standard deviation",
            LineItem::Revenue,
            config.sg_window,
        ),
        RatioFactor::new(
            format!("posqeps_{}qcount", config.positive_eps_window),
            "Quarters with positive diluted EPS in the trailing window",
            FactorCategory::Quality,
            columns(&[eps]),
            window::rolling_sum(positive, config.positive_eps_window),
        )
        .with_lookback(config.positive_eps_window),
    ]
}
