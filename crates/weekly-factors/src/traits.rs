//! Core trait definitions for factors.
//!
//! Every factor the engine emits implements [`Factor`], which carries the
//! metadata used for discovery and for the missing-input guard. Factors that
//! are computed from daily inputs (prices, benchmark, consensus) additionally
//! implement [`DailyFactor`].

use crate::{FactorCategory, Result, config::DEFAULT_WEEK_END_DAY, frame};
use chrono::{Datelike, Days, NaiveDate};
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Data frequency for factor computation and resampling.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFrequency {
    /// Daily frequency - one observation per row of the input
    Daily,
    /// Weekly frequency - weeks ending on the configured week-end day
    Weekly,
    /// Monthly frequency - calendar month ends
    Monthly,
    /// Quarterly frequency - calendar quarter ends, and fundamental factors
    Quarterly,
    /// Yearly frequency - calendar year ends
    Yearly,
}

impl DataFrequency {
    /// Suffix used in output column names, e.g. `pch63x0d` or `beta_60m`.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Daily => "d",
            Self::Weekly => "w",
            Self::Monthly => "m",
            Self::Quarterly => "q",
            Self::Yearly => "y",
        }
    }

    /// Name of the period-end label column derived for this frequency.
    ///
    /// `None` for daily data, which is never resampled.
    pub const fn period_column(&self) -> Option<&'static str> {
        match self {
            Self::Daily => None,
            Self::Weekly => Some(frame::WEEK_END),
            Self::Monthly => Some(frame::MONTH_END),
            Self::Quarterly => Some(frame::QUARTER_END),
            Self::Yearly => Some(frame::YEAR_END),
        }
    }

    /// Last calendar day of the period containing `date`, weeks ending Sunday.
    pub fn period_end(&self, date: NaiveDate) -> NaiveDate {
        self.period_end_on(date, DEFAULT_WEEK_END_DAY)
    }

    /// Last calendar day of the period containing `date`, weeks ending on
    /// `week_end_day` (Monday = 0).
    pub fn period_end_on(&self, date: NaiveDate, week_end_day: u8) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                let weekday = u64::from(date.weekday().num_days_from_monday());
                let remaining = (u64::from(week_end_day % 7) + 7 - weekday) % 7;
                date.checked_add_days(Days::new(remaining)).unwrap_or(date)
            }
            Self::Monthly => month_end(date.year(), date.month()).unwrap_or(date),
            Self::Quarterly => month_end(date.year(), date.month().div_ceil(3) * 3).unwrap_or(date),
            Self::Yearly => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
        }
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// A factor the engine can emit.
///
/// Implementors describe themselves; the engine uses [`Factor::required_columns`]
/// to decide whether the factor can be evaluated and [`Factor::outputs`] to
/// keep the output schema stable when it cannot.
pub trait Factor: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this factor.
    ///
    /// Should be snake_case and stable across versions.
    fn name(&self) -> &str;

    /// Human-readable description of what this factor measures.
    fn description(&self) -> &str;

    /// Factor category for grouping and analysis.
    fn category(&self) -> FactorCategory;

    /// Columns required in the input table.
    fn required_columns(&self) -> &[String];

    /// Columns this factor writes. Defaults to its name.
    fn outputs(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    /// Number of lookback periods needed for computation.
    ///
    /// Trading days for daily factors, quarters for fundamental factors,
    /// resampled periods otherwise.
    fn lookback(&self) -> usize;

    /// Data frequency the factor is evaluated on.
    fn frequency(&self) -> DataFrequency;
}

/// Marker trait for factor configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait FactorConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// A factor that supports runtime configuration.
///
/// This trait extends `Factor` to allow customization of lookback windows,
/// skip periods, and other parameters.
pub trait ConfigurableFactor: Factor {
    /// Configuration type for this factor.
    type Config: FactorConfig;

    /// Create a new factor with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> FactorConfig for T {}

/// Which daily table a [`DailyFactor`] reads its required columns from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// The security's own price bars
    Prices,
    /// Consensus estimates forward-filled onto the daily calendar
    Consensus,
}

/// Daily tables handed to every [`DailyFactor`] of one invocation.
///
/// Price tables are sorted ascending, unique per date, and carry the
/// period-end label columns (`week_end`, `month_end`, ...).
#[derive(Debug, Clone, Copy)]
pub struct DailyInputs<'a> {
    /// The security's price bars
    pub prices: &'a DataFrame,
    /// The shared benchmark price bars
    pub benchmark: &'a DataFrame,
    /// Consensus forward-filled onto the calendar
    pub consensus: &'a DataFrame,
}

impl<'a> DailyInputs<'a> {
    /// Table backing the given source.
    pub const fn source(&self, source: InputSource) -> &'a DataFrame {
        match source {
            InputSource::Prices => self.prices,
            InputSource::Consensus => self.consensus,
        }
    }
}

/// A factor computed from daily inputs.
///
/// `compute` returns a table with a `date` column and one column per entry of
/// [`Factor::outputs`]. Dates are either trading days or period-end labels;
/// the engine places them on the daily calendar and forward-fills.
pub trait DailyFactor: Factor {
    /// Table the required columns are looked up in.
    fn input(&self) -> InputSource;

    /// Required columns absent from the inputs.
    fn missing_columns(&self, inputs: &DailyInputs<'_>) -> Vec<String> {
        frame::missing_columns(inputs.source(self.input()), self.required_columns())
    }

    /// Compute the factor's output columns.
    fn compute(&self, inputs: &DailyInputs<'_>) -> Result<DataFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(DataFrequency::Daily, ymd(2024, 2, 14), ymd(2024, 2, 14))]
    #[case(DataFrequency::Weekly, ymd(2024, 2, 14), ymd(2024, 2, 18))]
    #[case(DataFrequency::Weekly, ymd(2024, 2, 18), ymd(2024, 2, 18))]
    #[case(DataFrequency::Monthly, ymd(2024, 2, 14), ymd(2024, 2, 29))]
    #[case(DataFrequency::Monthly, ymd(2023, 12, 5), ymd(2023, 12, 31))]
    #[case(DataFrequency::Quarterly, ymd(2024, 2, 14), ymd(2024, 3, 31))]
    #[case(DataFrequency::Quarterly, ymd(2024, 11, 1), ymd(2024, 12, 31))]
    #[case(DataFrequency::Yearly, ymd(2024, 2, 14), ymd(2024, 12, 31))]
    fn test_period_end(
        #[case] frequency: DataFrequency,
        #[case] date: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(frequency.period_end(date), expected);
    }

    #[rstest]
    #[case(ymd(2024, 2, 14), 4, ymd(2024, 2, 16))]
    #[case(ymd(2024, 2, 16), 4, ymd(2024, 2, 16))]
    #[case(ymd(2024, 2, 17), 4, ymd(2024, 2, 23))]
    #[case(ymd(2024, 2, 12), 0, ymd(2024, 2, 12))]
    #[case(ymd(2024, 2, 14), 6, ymd(2024, 2, 18))]
    fn test_week_end_follows_configured_day(
        #[case] date: NaiveDate,
        #[case] week_end_day: u8,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(DataFrequency::Weekly.period_end_on(date, week_end_day), expected);
        assert_eq!(DataFrequency::Monthly.period_end_on(date, week_end_day), DataFrequency::Monthly.period_end(date));
    }

    #[test]
    fn test_suffix_and_period_column() {
        assert_eq!(DataFrequency::Daily.suffix(), "d");
        assert_eq!(DataFrequency::Monthly.suffix(), "m");
        assert_eq!(DataFrequency::Daily.period_column(), None);
        assert_eq!(DataFrequency::Weekly.period_column(), Some("week_end"));
    }
}
