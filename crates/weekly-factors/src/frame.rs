//! Table construction and reconciliation helpers.
//!
//! Dates travel as `YYYY-MM-DD` strings in a `date` column, so sorting the
//! column sorts chronologically. Every input table goes through the same
//! reconciliation before use: validate, cast numerics, sort by date, group by
//! date and keep the first observed value.

use crate::{
    DataFrequency, FactorError, Result,
    types::{CalendarRow, ConsensusRecord, LineItem, PriceBar, QuarterlyStatementRecord},
};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Date key of every table.
pub const DATE: &str = "date";
/// Security identifier.
pub const TICKER: &str = "ticker";
/// Filing date of the quarterly figures.
pub const REPORT_DATE: &str = "report_date";
/// Day of week from the calendar, Monday = 0.
pub const DAY_OF_WEEK: &str = "day_of_week";
/// End date of the run.
pub const UPDATED_DT: &str = "updated_dt";
/// Marks rows that carry a quarterly statement.
pub const STATEMENT_ROW: &str = "statement_row";

/// Opening price.
pub const OPEN: &str = "open";
/// Session high.
pub const HIGH: &str = "high";
/// Session low.
pub const LOW: &str = "low";
/// Closing price.
pub const CLOSE: &str = "close";
/// Adjusted close.
pub const ADJ_CLOSE: &str = "adj_close";
/// Shares traded.
pub const VOLUME: &str = "volume";
/// Median analyst target price.
pub const TARGET_MEDIAN_PRICE: &str = "target_median_price";
/// Adjusted close times shares outstanding.
pub const MARKET_CAP: &str = "market_cap";

/// Week-ending (Sunday) label.
pub const WEEK_END: &str = "week_end";
/// Month-end label.
pub const MONTH_END: &str = "month_end";
/// Quarter-end label.
pub const QUARTER_END: &str = "quarter_end";
/// Year-end label.
pub const YEAR_END: &str = "year_end";

/// Numeric columns of a price table.
pub const PRICE_COLUMNS: [&str; 6] = [OPEN, HIGH, LOW, CLOSE, ADJ_CLOSE, VOLUME];

const RESAMPLED: [DataFrequency; 4] = [
    DataFrequency::Weekly,
    DataFrequency::Monthly,
    DataFrequency::Quarterly,
    DataFrequency::Yearly,
];

/// Missing `Float64` literal.
pub fn null_f64() -> Expr {
    lit(NULL).cast(DataType::Float64)
}

/// `expr` with non-finite values (NaN, ±inf) replaced by missing.
pub fn finite_or_null(expr: Expr) -> Expr {
    when(expr.clone().is_finite()).then(expr).otherwise(null_f64())
}

/// Whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Entries of `required` that are not columns of `df`.
pub fn missing_columns(df: &DataFrame, required: &[String]) -> Vec<String> {
    required.iter().filter(|name| !has_column(df, name)).cloned().collect()
}

/// Column names of `df`, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns().iter().map(|c| c.name().to_string()).collect()
}

/// Whether `dtype` holds numbers (any integer or float width) or only nulls.
pub fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Null)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Price bars as a table: `date` plus [`PRICE_COLUMNS`].
pub fn price_frame(bars: &[PriceBar]) -> Result<DataFrame> {
    let df = df!(
        DATE => bars.iter().map(|b| b.date.to_string()).collect::<Vec<_>>(),
        OPEN => bars.iter().map(|b| finite(b.open)).collect::<Vec<_>>(),
        HIGH => bars.iter().map(|b| finite(b.high)).collect::<Vec<_>>(),
        LOW => bars.iter().map(|b| finite(b.low)).collect::<Vec<_>>(),
        CLOSE => bars.iter().map(|b| finite(b.close)).collect::<Vec<_>>(),
        ADJ_CLOSE => bars.iter().map(|b| finite(b.adj_close)).collect::<Vec<_>>(),
        VOLUME => bars.iter().map(|b| finite(b.volume)).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// Quarterly statements as a table: `date` (quarter end), `ticker`,
/// `report_date` and one column per [`LineItem`].
pub fn statement_frame(records: &[QuarterlyStatementRecord]) -> Result<DataFrame> {
    let mut df = df!(
        DATE => records.iter().map(|r| r.as_of_date.to_string()).collect::<Vec<_>>(),
        TICKER => records.iter().map(|r| r.ticker.clone()).collect::<Vec<_>>(),
        REPORT_DATE => records.iter().map(|r| r.report_date.to_string()).collect::<Vec<_>>(),
    )?;
    for item in LineItem::ALL {
        let values: Vec<Option<f64>> = records.iter().map(|r| finite(r.value(item))).collect();
        df.with_column(Series::new(item.column().into(), values))?;
    }
    Ok(df)
}

/// Consensus updates as a table: `date`, `target_median_price`.
pub fn consensus_frame(records: &[ConsensusRecord]) -> Result<DataFrame> {
    let df = df!(
        DATE => records.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        TARGET_MEDIAN_PRICE => records.iter().map(|r| finite(r.target_median_price)).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// Calendar as a table: `date`, `day_of_week`.
pub fn calendar_frame(rows: &[CalendarRow]) -> Result<DataFrame> {
    let df = df!(
        DATE => rows.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        DAY_OF_WEEK => rows.iter().map(|r| i32::from(r.day_of_week)).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// Check that `df` has a string `date` column.
pub fn require_dates(df: &DataFrame, table: &str) -> Result<()> {
    let column = df
        .column(DATE)
        .map_err(|_| FactorError::MissingColumn(format!("{table}.{DATE}")))?;
    if column.dtype() != &DataType::String {
        return Err(FactorError::MalformedInput(format!(
            "{table}.{DATE} must hold YYYY-MM-DD strings, found {}",
            column.dtype()
        )));
    }
    Ok(())
}

/// Parse the `date` column.
pub fn parse_dates(df: &DataFrame) -> Result<Vec<NaiveDate>> {
    parse_date_column(df, DATE)
}

/// Parse a column of `YYYY-MM-DD` strings. Missing values are rejected.
pub fn parse_date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let dates = df.column(name)?.str()?;
    dates
        .into_iter()
        .map(|value| {
            let value = value.ok_or_else(|| FactorError::MalformedInput(format!("missing {name}")))?;
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|e| FactorError::MalformedInput(format!("unparseable date {value}: {e}")))
        })
        .collect()
}

/// Cast the present `columns` to `Float64`, turning non-finite values into
/// missing. Non-numeric columns are rejected.
pub fn numeric_columns(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut exprs = Vec::new();
    for &name in columns {
        let Ok(column) = df.column(name) else {
            continue;
        };
        if !is_numeric(column.dtype()) {
            return Err(FactorError::MalformedInput(format!(
                "column {name} must be numeric, found {}",
                column.dtype()
            )));
        }
        exprs.push(finite_or_null(col(name).cast(DataType::Float64)).alias(name));
    }
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Sort by date and keep, for every column, the first non-missing value
/// observed on each date.
pub fn first_per_date(df: &DataFrame) -> Result<DataFrame> {
    let aggs: Vec<Expr> = column_names(df)
        .iter()
        .filter(|name| name.as_str() != DATE)
        .map(|name| col(name.as_str()).drop_nulls().first())
        .collect();

    let sorted = df
        .clone()
        .lazy()
        .sort([DATE], SortMultipleOptions::default().with_maintain_order(true));
    let result = if aggs.is_empty() {
        sorted
            .group_by_stable([col(DATE)])
            .agg([len().alias("rows")])
            .select([col(DATE)])
    } else {
        sorted.group_by_stable([col(DATE)]).agg(aggs)
    };

    Ok(result.collect()?)
}

/// Add `week_end`, `month_end`, `quarter_end` and `year_end` label columns,
/// weeks ending on `week_end_day` (Monday = 0).
pub fn with_period_ends(df: &DataFrame, week_end_day: u8) -> Result<DataFrame> {
    let dates = parse_dates(df)?;
    let mut out = df.clone();
    for frequency in RESAMPLED {
        if let Some(name) = frequency.period_column() {
            let labels: Vec<String> = dates
                .iter()
                .map(|d| frequency.period_end_on(*d, week_end_day).to_string())
                .collect();
            out.with_column(Series::new(name.into(), labels))?;
        }
    }
    Ok(out)
}

/// Sorted union of the dates of every table, as a one-column table.
pub fn date_spine(frames: &[&DataFrame]) -> Result<DataFrame> {
    let mut dates = BTreeSet::new();
    for df in frames {
        let column = df.column(DATE)?.str()?;
        dates.extend(column.into_iter().flatten().map(str::to_string));
    }
    let df = df!(DATE => dates.into_iter().collect::<Vec<_>>())?;
    Ok(df)
}

/// Left-join every table onto the union of their dates.
///
/// Each table must be unique per date.
pub fn merge_on_dates(frames: &[&DataFrame]) -> Result<DataFrame> {
    let mut merged = date_spine(frames)?.lazy();
    for df in frames {
        merged = merged.join(
            (*df).clone().lazy(),
            [col(DATE)],
            [col(DATE)],
            JoinArgs::new(JoinType::Left),
        );
    }
    Ok(merged
        .sort([DATE], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?)
}

/// Forward-fill every column except `keep`.
pub fn forward_fill(df: &DataFrame, keep: &[&str]) -> Result<DataFrame> {
    let exprs: Vec<Expr> = column_names(df)
        .iter()
        .filter(|name| !keep.contains(&name.as_str()))
        .map(|name| col(name.as_str()).forward_fill(None))
        .collect();
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Replace ±inf and NaN with missing in every float column.
pub fn sanitize_non_finite(df: &DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::Float64 | DataType::Float32))
        .map(|c| {
            let name = c.name().as_str();
            finite_or_null(col(name)).alias(name)
        })
        .collect();
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Values of a float column as options.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df.column(name)?.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_per_date_keeps_first_observation() {
        let df = df![
            "date" => ["2024-01-02", "2024-01-01", "2024-01-02", "2024-01-03"],
            "value" => [Some(2.0), Some(1.0), Some(9.0), None],
            "other" => [None, Some(10.0), Some(20.0), Some(30.0)],
        ]
        .unwrap();

        let result = first_per_date(&df).unwrap();

        assert_eq!(result.height(), 3);
        assert_eq!(
            result.column("date").unwrap().str().unwrap().get(1),
            Some("2024-01-02")
        );
        assert_eq!(
            f64_values(&result, "value").unwrap(),
            vec![Some(1.0), Some(2.0), None]
        );
        // first non-missing value wins
        assert_eq!(
            f64_values(&result, "other").unwrap(),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
    }

    #[test]
    fn test_numeric_columns_rejects_strings() {
        let df = df![
            "date" => ["2024-01-01"],
            "revenue" => ["lots"],
        ]
        .unwrap();

        let err = numeric_columns(&df, &["revenue"]).unwrap_err();
        assert!(matches!(err, FactorError::MalformedInput(_)));
    }

    #[test]
    fn test_numeric_columns_accepts_narrow_integers() {
        let df = df![
            "date" => ["2024-01-01", "2024-01-02"],
            "total_assets" => [1200i64, -5],
            "shares_outstanding" => [7i64, 8],
        ]
        .unwrap()
        .lazy()
        .with_columns([
            col("total_assets").cast(DataType::Int16),
            col("shares_outstanding").cast(DataType::UInt8),
        ])
        .collect()
        .unwrap();

        let result = numeric_columns(&df, &["total_assets", "shares_outstanding"]).unwrap();

        assert_eq!(f64_values(&result, "total_assets").unwrap(), vec![Some(1200.0), Some(-5.0)]);
        assert_eq!(f64_values(&result, "shares_outstanding").unwrap(), vec![Some(7.0), Some(8.0)]);
    }

    #[test]
    fn test_numeric_columns_nulls_non_finite() {
        let df = df![
            "date" => ["2024-01-01", "2024-01-02", "2024-01-03"],
            "revenue" => [1.0, f64::NAN, f64::INFINITY],
            "shares" => [1i64, 2, 3],
        ]
        .unwrap();

        let result = numeric_columns(&df, &["revenue", "shares", "absent"]).unwrap();

        assert_eq!(f64_values(&result, "revenue").unwrap(), vec![Some(1.0), None, None]);
        assert_eq!(f64_values(&result, "shares").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_with_period_ends() {
        let df = df!["date" => ["2024-02-14", "2024-12-30"]].unwrap();
        let result = with_period_ends(&df, 6).unwrap();

        let weeks = result.column(WEEK_END).unwrap().str().unwrap();
        assert_eq!(weeks.get(0), Some("2024-02-18"));
        assert_eq!(weeks.get(1), Some("2025-01-05"));

        let months = result.column(MONTH_END).unwrap().str().unwrap();
        assert_eq!(months.get(0), Some("2024-02-29"));

        let years = result.column(YEAR_END).unwrap().str().unwrap();
        assert_eq!(years.get(1), Some("2024-12-31"));

        let fridays = with_period_ends(&df, 4).unwrap();
        let weeks = fridays.column(WEEK_END).unwrap().str().unwrap();
        assert_eq!(weeks.get(0), Some("2024-02-16"));
        assert_eq!(weeks.get(1), Some("2025-01-03"));
    }

    #[test]
    fn test_require_dates() {
        let df = df!["day" => ["2024-01-01"]].unwrap();
        assert!(matches!(require_dates(&df, "prices"), Err(FactorError::MissingColumn(_))));

        let df = df!["date" => [20240101i64]].unwrap();
        assert!(matches!(require_dates(&df, "prices"), Err(FactorError::MalformedInput(_))));

        let df = df!["date" => ["2024-01-01"]].unwrap();
        assert!(require_dates(&df, "prices").is_ok());
    }

    #[test]
    fn test_merge_on_dates_and_forward_fill() {
        let daily = df![
            "date" => ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"],
            "day_of_week" => [0, 1, 2, 3],
        ]
        .unwrap();
        let sparse = df![
            "date" => ["2024-01-02"],
            "roa" => [0.5],
        ]
        .unwrap();

        let merged = merge_on_dates(&[&daily, &sparse]).unwrap();
        assert_eq!(merged.height(), 4);
        assert_eq!(
            f64_values(&merged, "roa").unwrap(),
            vec![None, Some(0.5), None, None]
        );

        let filled = forward_fill(&merged, &[DATE, DAY_OF_WEEK]).unwrap();
        assert_eq!(
            f64_values(&filled, "roa").unwrap(),
            vec![None, Some(0.5), Some(0.5), Some(0.5)]
        );
    }

    #[test]
    fn test_sanitize_non_finite() {
        let df = df![
            "date" => ["2024-01-01", "2024-01-02"],
            "roa" => [f64::INFINITY, 0.25],
            "roe" => [f64::NEG_INFINITY, f64::NAN],
        ]
        .unwrap();

        let result = sanitize_non_finite(&df).unwrap();
        assert_eq!(f64_values(&result, "roa").unwrap(), vec![None, Some(0.25)]);
        assert_eq!(f64_values(&result, "roe").unwrap(), vec![None, None]);
    }

    #[test]
    fn test_record_frames() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        let prices = price_frame(&[PriceBar::flat("AAPL", date, 10.0)]).unwrap();
        assert_eq!(prices.width(), 7);

        let statement = QuarterlyStatementRecord::new("AAPL", date, date)
            .with(LineItem::Revenue, f64::NAN);
        let statements = statement_frame(&[statement]).unwrap();
        assert_eq!(statements.width(), 3 + LineItem::ALL.len());
        assert_eq!(f64_values(&statements, "revenue").unwrap(), vec![None]);
    }
}
