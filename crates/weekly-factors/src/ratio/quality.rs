//! Profitability and efficiency ratios on trailing figures.
//!
//! Denominators are used as reported: a negative equity or asset base gives
//! a ratio with a flipped sign, and a zero base gives a non-finite value that
//! the engine turns into missing at the end of the run.

use super::{RatioFactor, columns};
use crate::{FactorCategory, LineItem};
use polars::prelude::*;

fn ttm(item: LineItem) -> String {
    item.ttm_column()
}

fn ratio_over(name: &str, description: &str, numerator: &str, denominator: &str) -> RatioFactor {
    RatioFactor::new(
        name,
        description,
        FactorCategory::Quality,
        columns(&[numerator, denominator]),
        col(numerator) / col(denominator),
    )
}

/// `rdi`, `sgi`, `fcfta`, `capacq`, `roe`, `roa`.
pub fn ratios() -> Vec<RatioFactor> {
    let revenue = ttm(LineItem::Revenue);
    let net_income = ttm(LineItem::NetIncome);
    let ocf = ttm(LineItem::OperatingCashFlow);
    let dividends = ttm(LineItem::DividendsPaid);
    let total_assets = LineItem::TotalAssets.column();
    let equity = LineItem::StockholdersEquity.column();

    vec![
        ratio_over(
            "rdi",
            "Trailing R&D expense over trailing revenue",
            &ttm(LineItem::ResearchDevelopment),
            &revenue,
        ),
        ratio_over(
            "sgi",
            "Trailing SG&A expense over trailing revenue",
            &ttm(LineItem::SellingGeneralAdmin),
            &revenue,
        ),
        ratio_over(
            "fcfta",
            "Trailing free cash flow over latest total assets",
            &ttm(LineItem::FreeCashFlow),
            total_assets,
        ),
        RatioFactor::new(
            "capacq",
            "Trailing operating cash flow net of dividends over trailing revenue",
            FactorCategory::Quality,
            columns(&[&ocf, &dividends, &revenue]),
            (col(ocf.as_str()) - col(dividends.as_str())) / col(revenue.as_str()),
        ),
        ratio_over("roe", "Trailing net income over latest stockholders' equity", &net_income, equity),
        ratio_over("roa", "Trailing net income over latest total assets", &net_income, total_assets),
    ]
}
