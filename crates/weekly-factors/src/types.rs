//! Input and output records.
//!
//! These are the typed forms of the engine's boundary. They convert to
//! polars tables through the [`frame`](crate::frame) module.

use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One trading day of prices for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date
    pub date: NaiveDate,
    /// Security identifier, empty when the source table has none
    #[serde(default)]
    pub ticker: String,
    /// Opening price
    pub open: Option<f64>,
    /// Session high
    pub high: Option<f64>,
    /// Session low
    pub low: Option<f64>,
    /// Closing price
    pub close: Option<f64>,
    /// Split- and dividend-adjusted close
    pub adj_close: Option<f64>,
    /// Shares traded
    pub volume: Option<f64>,
}

impl PriceBar {
    /// Bar with every price set to `adj_close` and no volume.
    pub fn flat(ticker: impl Into<String>, date: NaiveDate, adj_close: f64) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            open: Some(adj_close),
            high: Some(adj_close),
            low: Some(adj_close),
            close: Some(adj_close),
            adj_close: Some(adj_close),
            volume: None,
        }
    }
}

/// Financial statement line items carried on a quarterly record.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineItem {
    /// Total revenue
    Revenue,
    /// Net income
    NetIncome,
    /// Research and development expense
    ResearchDevelopment,
    /// Selling, general and administrative expense
    SellingGeneralAdmin,
    /// Operating cash flow
    OperatingCashFlow,
    /// Free cash flow
    FreeCashFlow,
    /// Cash dividends paid
    DividendsPaid,
    /// Basic earnings per share
    BasicEps,
    /// Diluted earnings per share
    DilutedEps,
    /// Shares outstanding
    SharesOutstanding,
    /// Total assets
    TotalAssets,
    /// Stockholders' equity
    StockholdersEquity,
}

impl LineItem {
    /// Every line item.
    pub const ALL: [Self; 12] = [
        Self::Revenue,
        Self::NetIncome,
        Self::ResearchDevelopment,
        Self::SellingGeneralAdmin,
        Self::OperatingCashFlow,
        Self::FreeCashFlow,
        Self::DividendsPaid,
        Self::BasicEps,
        Self::DilutedEps,
        Self::SharesOutstanding,
        Self::TotalAssets,
        Self::StockholdersEquity,
    ];

    /// Flow items summed into trailing-twelve-month figures.
    pub const FLOWS: [Self; 9] = [
        Self::FreeCashFlow,
        Self::DividendsPaid,
        Self::OperatingCashFlow,
        Self::Revenue,
        Self::NetIncome,
        Self::ResearchDevelopment,
        Self::SellingGeneralAdmin,
        Self::BasicEps,
        Self::DilutedEps,
    ];

    /// Raw column name.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::NetIncome => "net_income",
            Self::ResearchDevelopment => "research_development",
            Self::SellingGeneralAdmin => "selling_general_admin",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::FreeCashFlow => "free_cash_flow",
            Self::DividendsPaid => "dividends_paid",
            Self::BasicEps => "basic_eps",
            Self::DilutedEps => "diluted_eps",
            Self::SharesOutstanding => "shares_outstanding",
            Self::TotalAssets => "total_assets",
            Self::StockholdersEquity => "stockholders_equity",
        }
    }

    /// Trailing-twelve-month sum column, e.g. `ttm_revenue`.
    pub fn ttm_column(&self) -> String {
        format!("ttm_{}", self.column())
    }

    /// Growth of the TTM figure, e.g. `growth_revenue`.
    pub fn growth_column(&self) -> String {
        format!("growth_{}", self.column())
    }

    /// Rolling median of growth over `window` quarters.
    pub fn median_growth_column(&self, window: usize) -> String {
        format!("median_growth_{window}q_{}", self.column())
    }

    /// Rolling standard deviation of growth over `window` quarters.
    pub fn stdev_growth_column(&self, window: usize) -> String {
        format!("stdev_growth_{window}q_{}", self.column())
    }
}

/// One fiscal quarter of statement data for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyStatementRecord {
    /// Security identifier, empty when the source table has none
    #[serde(default)]
    pub ticker: String,
    /// Fiscal quarter end
    pub as_of_date: NaiveDate,
    /// Filing the figures come from
    pub report_date: NaiveDate,
    /// Total revenue
    pub revenue: Option<f64>,
    /// Net income
    pub net_income: Option<f64>,
    /// Research and development expense
    pub research_development: Option<f64>,
    /// Selling, general and administrative expense
    pub selling_general_admin: Option<f64>,
    /// Operating cash flow
    pub operating_cash_flow: Option<f64>,
    /// Free cash flow
    pub free_cash_flow: Option<f64>,
    /// Cash dividends paid
    pub dividends_paid: Option<f64>,
    /// Basic EPS
    pub basic_eps: Option<f64>,
    /// Diluted EPS
    pub diluted_eps: Option<f64>,
    /// Shares outstanding
    pub shares_outstanding: Option<f64>,
    /// Total assets
    pub total_assets: Option<f64>,
    /// Stockholders' equity
    pub stockholders_equity: Option<f64>,
}

impl QuarterlyStatementRecord {
    /// Record with no line items filled in.
    pub fn new(ticker: impl Into<String>, as_of_date: NaiveDate, report_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            as_of_date,
            report_date,
            revenue: None,
            net_income: None,
            research_development: None,
            selling_general_admin: None,
            operating_cash_flow: None,
            free_cash_flow: None,
            dividends_paid: None,
            basic_eps: None,
            diluted_eps: None,
            shares_outstanding: None,
            total_assets: None,
            stockholders_equity: None,
        }
    }

    /// Builder-style setter for one line item.
    #[must_use]
    pub fn with(mut self, item: LineItem, value: f64) -> Self {
        *self.slot(item) = Some(value);
        self
    }

    /// Value of one line item.
    pub const fn value(&self, item: LineItem) -> Option<f64> {
        match item {
            LineItem::Revenue => self.revenue,
            LineItem::NetIncome => self.net_income,
            LineItem::ResearchDevelopment => self.research_development,
            LineItem::SellingGeneralAdmin => self.selling_general_admin,
            LineItem::OperatingCashFlow => self.operating_cash_flow,
            LineItem::FreeCashFlow => self.free_cash_flow,
            LineItem::DividendsPaid => self.dividends_paid,
            LineItem::BasicEps => self.basic_eps,
            LineItem::DilutedEps => self.diluted_eps,
            LineItem::SharesOutstanding => self.shares_outstanding,
            LineItem::TotalAssets => self.total_assets,
            LineItem::StockholdersEquity => self.stockholders_equity,
        }
    }

    fn slot(&mut self, item: LineItem) -> &mut Option<f64> {
        match item {
            LineItem::Revenue => &mut self.revenue,
            LineItem::NetIncome => &mut self.net_income,
            LineItem::ResearchDevelopment => &mut self.research_development,
            LineItem::SellingGeneralAdmin => &mut self.selling_general_admin,
            LineItem::OperatingCashFlow => &mut self.operating_cash_flow,
            LineItem::FreeCashFlow => &mut self.free_cash_flow,
            LineItem::DividendsPaid => &mut self.dividends_paid,
            LineItem::BasicEps => &mut self.basic_eps,
            LineItem::DilutedEps => &mut self.diluted_eps,
            LineItem::SharesOutstanding => &mut self.shares_outstanding,
            LineItem::TotalAssets => &mut self.total_assets,
            LineItem::StockholdersEquity => &mut self.stockholders_equity,
        }
    }
}

/// An analyst consensus update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    /// Date the consensus was observed
    pub date: NaiveDate,
    /// Median analyst target price
    pub target_median_price: Option<f64>,
}

/// One calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    /// Calendar date
    pub date: NaiveDate,
    /// Day of week, Monday = 0 through Sunday = 6
    pub day_of_week: u8,
}

impl From<NaiveDate> for CalendarRow {
    fn from(date: NaiveDate) -> Self {
        Self {
            date,
            // num_days_from_monday is at most 6
            day_of_week: date.weekday().num_days_from_monday() as u8,
        }
    }
}

/// Complete daily calendar from `start` to `end`, both inclusive.
pub fn daily_calendar(start: NaiveDate, end: NaiveDate) -> Vec<CalendarRow> {
    start.iter_days().take_while(|d| *d <= end).map(CalendarRow::from).collect()
}

/// Everything one invocation needs about one security.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityInput {
    /// Security identifier
    pub ticker: String,
    /// Daily price bars
    pub prices: Vec<PriceBar>,
    /// Quarterly statements
    pub statements: Vec<QuarterlyStatementRecord>,
    /// Consensus updates
    pub consensus: Vec<ConsensusRecord>,
}

impl SecurityInput {
    /// Empty input for `ticker`.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self { ticker: ticker.into(), ..Default::default() }
    }
}

/// One week-ending row of the factor panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyFactorRecord {
    /// Security identifier
    pub ticker: String,
    /// Week-ending date
    pub as_of_date: NaiveDate,
    /// Filing the fundamentals of this row come from
    pub report_date: NaiveDate,
    /// Factor values by name, missing values as `None`
    pub factors: BTreeMap<String, Option<f64>>,
    /// End date of the run that produced the row
    pub updated_dt: NaiveDate,
}

impl WeeklyFactorRecord {
    /// Value of one factor, `None` when missing or unknown.
    pub fn factor(&self, name: &str) -> Option<f64> {
        self.factors.get(name).copied().flatten()
    }
}
