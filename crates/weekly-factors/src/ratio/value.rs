//! Market capitalisation and valuation yields on the daily table.

use super::{RatioFactor, columns};
use crate::{DataFrequency, FactorCategory, LineItem, RatioConfig, frame, window};
use polars::prelude::*;

/// Name of the trailing earnings yield, the base of the forward and average
/// yields.
pub const EYLDTRL: &str = "eyldtrl";

/// `market_cap`, `fcfyld`, `eyldtrl`, `eyld_fwd<y>yr`, `eyld_<q>qavg`.
pub fn ratios(config: &RatioConfig) -> Vec<RatioFactor> {
    let shares = LineItem::SharesOutstanding.column();
    let fcf = LineItem::FreeCashFlow.ttm_column();
    let net_income = LineItem::NetIncome.ttm_column();
    let quarters = config.forward_yield_quarters();
    let median_growth = LineItem::NetIncome.median_growth_column(quarters);

    vec![
        RatioFactor::new(
            frame::MARKET_CAP,
            "Adjusted close times latest shares outstanding",
            FactorCategory::Size,
            columns(&[frame::ADJ_CLOSE, shares]),
            col(frame::ADJ_CLOSE) * col(shares),
        ),
        RatioFactor::new(
            "fcfyld",
            "Trailing free cash flow over market capitalisation",
            FactorCategory::Value,
            columns(&[&fcf, frame::MARKET_CAP]),
            col(fcf.as_str()) / col(frame::MARKET_CAP),
        ),
        RatioFactor::new(
            EYLDTRL,
            "Trailing net income over market capitalisation",
            FactorCategory::Value,
            columns(&[&net_income, frame::MARKET_CAP]),
            col(net_income.as_str()) / col(frame::MARKET_CAP),
        ),
        RatioFactor::new(
            format!("eyld_fwd{}yr", config.forward_yield_years),
            "Trailing earnings yield compounded at the median net income growth",
            FactorCategory::Value,
            columns(&[EYLDTRL, &median_growth]),
            col(EYLDTRL) * window::powi(lit(1.0) + col(median_growth.as_str()), quarters),
        )
        .with_lookback(quarters),
        RatioFactor::new(
            format!("eyld_{}qavg", config.average_yield_quarters),
            "Mean trailing earnings yield over recent statement dates",
            FactorCategory::Value,
            columns(&[EYLDTRL]),
            window::rolling_mean(col(EYLDTRL), config.average_yield_quarters),
        )
        .with_lookback(config.average_yield_quarters)
        .sampled_on(frame::STATEMENT_ROW),
    ]
    .into_iter()
    .map(|ratio| ratio.with_frequency(DataFrequency::Daily))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Diagnostics, Stage, ratio::apply_ratios};
    use approx::assert_relative_eq;

    #[test]
    fn test_yields() {
        let config = RatioConfig {
            forward_yield_years: 1,
            average_yield_quarters: 2,
            ..Default::default()
        };
        let df = df![
            "date" => ["2024-03-31", "2024-04-01", "2024-06-30", "2024-07-01"],
            "statement_row" => [true, false, true, false],
            "adj_close" => [10.0, 20.0, 20.0, 25.0],
            "shares_outstanding" => [100.0, 100.0, 100.0, 100.0],
            "ttm_free_cash_flow" => [50.0, 50.0, 100.0, 100.0],
            "ttm_net_income" => [100.0, 100.0, 200.0, 200.0],
            "median_growth_4q_net_income" => [0.1, 0.1, 0.1, 0.1],
        ]
        .unwrap();
        let mut diagnostics = Diagnostics::new("TEST");

        let result = apply_ratios(&df, &ratios(&config), Stage::Valuation, &mut diagnostics).unwrap();
        let values = |name: &str| frame::f64_values(&result, name).unwrap();

        assert_relative_eq!(values("market_cap")[1].unwrap(), 2000.0);
        assert_relative_eq!(values("fcfyld")[0].unwrap(), 0.05);
        assert_relative_eq!(values("eyldtrl")[3].unwrap(), 0.08);
        assert_relative_eq!(values("eyld_fwd1yr")[0].unwrap(), 0.1 * 1.1_f64.powi(4), epsilon = 1e-12);

        // statement rows carry 0.1 and 0.1, the other rows hold the last value
        let avg = values("eyld_2qavg");
        assert_eq!(avg[0], None);
        assert_eq!(avg[1], None);
        assert_relative_eq!(avg[2].unwrap(), 0.1);
        assert_relative_eq!(avg[3].unwrap(), 0.1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_shares_cascades_as_missing() {
        let df = df![
            "date" => ["2024-03-31"],
            "statement_row" => [true],
            "adj_close" => [10.0],
            "ttm_net_income" => [100.0],
        ]
        .unwrap();
        let mut diagnostics = Diagnostics::new("TEST");

        let result = apply_ratios(&df, &ratios(&RatioConfig::default()), Stage::Valuation, &mut diagnostics)
            .unwrap();

        assert_eq!(frame::f64_values(&result, "market_cap").unwrap(), vec![None]);
        assert_eq!(frame::f64_values(&result, "eyldtrl").unwrap(), vec![None]);
        assert_eq!(diagnostics.for_subject("market_cap").count(), 1);
    }
}
