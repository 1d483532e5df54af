//! Synthetic inputs shared by the unit tests.

use crate::{
    ConsensusRecord, LineItem, PriceBar, QuarterlyStatementRecord, SecurityInput,
    config::DEFAULT_WEEK_END_DAY, frame, traits::DataFrequency,
};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use polars::prelude::*;

pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// `n` consecutive weekdays from `start`.
pub(crate) fn trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

/// Weekdays from `start` to `end` inclusive.
pub(crate) fn weekdays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Bars whose high and low sit 1% either side of the close.
pub(crate) fn bars(ticker: &str, dates: &[NaiveDate], prices: &[f64]) -> Vec<PriceBar> {
    dates
        .iter()
        .zip(prices)
        .map(|(date, &price)| PriceBar {
            high: Some(price * 1.01),
            low: Some(price * 0.99),
            volume: Some(1_000_000.0),
            ..PriceBar::flat(ticker, *date, price)
        })
        .collect()
}

/// Reconciled price table with period-end labels.
pub(crate) fn price_table(dates: &[NaiveDate], prices: &[f64]) -> DataFrame {
    let df = frame::price_frame(&bars("TEST", dates, prices)).unwrap();
    frame::with_period_ends(&df, DEFAULT_WEEK_END_DAY).unwrap()
}

fn path(i: usize, drift: f64, wave: f64) -> f64 {
    let t = i as f64;
    50.0 * (1.0 + drift * t) + wave * (t / 9.0).sin()
}

/// Benchmark bars over every weekday of the range.
pub(crate) fn benchmark(start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    let dates = weekdays_between(start, end);
    let prices: Vec<f64> = (0..dates.len()).map(|i| path(i, 0.0003, 1.5)).collect();
    bars("BENCH", &dates, &prices)
}

/// Quarter ends falling inside the range.
pub(crate) fn quarter_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut ends: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|d| DataFrequency::Quarterly.period_end(d))
        .filter(|d| *d <= end)
        .collect();
    ends.dedup();
    ends
}

/// One quarterly statement with every line item filled.
pub(crate) fn statement(ticker: &str, as_of: NaiveDate, q: usize) -> QuarterlyStatementRecord {
    let t = q as f64;
    let seasonal = [0.0, 15.0, 30.0, -10.0][q % 4];
    let revenue = 1000.0 + 20.0 * t + seasonal;
    let net_income = 80.0 + 4.0 * t + 0.5 * seasonal - if q % 5 == 0 { 30.0 } else { 0.0 };
    let shares = 100.0 - 0.2 * t;

    QuarterlyStatementRecord::new(ticker, as_of, as_of.checked_add_days(Days::new(30)).unwrap())
        .with(LineItem::Revenue, revenue)
        .with(LineItem::NetIncome, net_income)
        .with(LineItem::ResearchDevelopment, 0.08 * revenue)
        .with(LineItem::SellingGeneralAdmin, 0.2 * revenue)
        .with(LineItem::OperatingCashFlow, 1.3 * net_income)
        .with(LineItem::FreeCashFlow, 1.1 * net_income)
        .with(LineItem::DividendsPaid, 10.0)
        .with(LineItem::BasicEps, net_income / shares)
        .with(LineItem::DilutedEps, net_income / (shares * 1.02))
        .with(LineItem::SharesOutstanding, shares)
        .with(LineItem::TotalAssets, 5000.0 + 25.0 * t)
        .with(LineItem::StockholdersEquity, 2000.0 + 10.0 * t)
}

/// A security with prices, statements and monthly consensus over the range.
pub(crate) fn security(ticker: &str, start: NaiveDate, end: NaiveDate) -> SecurityInput {
    let dates = weekdays_between(start, end);
    let prices: Vec<f64> = (0..dates.len()).map(|i| path(i, 0.0005, 3.0)).collect();

    let statements = quarter_ends(start, end)
        .into_iter()
        .enumerate()
        .map(|(q, as_of)| statement(ticker, as_of, q))
        .collect();

    let consensus = dates
        .iter()
        .zip(&prices)
        .enumerate()
        .filter(|(i, _)| i % 20 == 0)
        .map(|(i, (date, price))| ConsensusRecord {
            date: *date,
            target_median_price: Some(price * (1.15 + 0.01 * ((i / 20) % 3) as f64)),
        })
        .collect();

    SecurityInput {
        ticker: ticker.to_string(),
        prices: bars(ticker, &dates, &prices),
        statements,
        consensus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_ends() {
        let ends = quarter_ends(ymd(2023, 2, 1), ymd(2023, 12, 30));
        assert_eq!(ends, vec![ymd(2023, 3, 31), ymd(2023, 6, 30), ymd(2023, 9, 30)]);
    }

    #[test]
    fn test_security_is_complete() {
        let input = security("TEST", ymd(2023, 1, 1), ymd(2023, 12, 31));
        assert_eq!(input.statements.len(), 4);
        assert_eq!(input.prices.len(), 260);
        assert!(!input.consensus.is_empty());
    }
}
