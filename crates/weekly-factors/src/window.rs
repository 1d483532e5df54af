//! Rolling-window primitives.
//!
//! Every primitive is a polars expression over one column and yields a series
//! of the same length. Rolling statistics only emit a value once the trailing
//! window holds `window` non-missing observations; partial windows are
//! missing, never approximated.

use crate::{DataFrequency, FactorError, Result, frame};
use polars::prelude::*;

/// Options for a window that must be completely populated.
pub fn full_window(window: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window,
        ..Default::default()
    }
}

/// Sum over the trailing `window` observations.
pub fn rolling_sum(expr: Expr, window: usize) -> Expr {
    expr.rolling_sum(full_window(window))
}

/// Mean over the trailing `window` observations.
pub fn rolling_mean(expr: Expr, window: usize) -> Expr {
    expr.rolling_mean(full_window(window))
}

/// Median over the trailing `window` observations.
pub fn rolling_median(expr: Expr, window: usize) -> Expr {
    expr.rolling_median(full_window(window))
}

/// Sample standard deviation over the trailing `window` observations.
pub fn rolling_stdev(expr: Expr, window: usize) -> Expr {
    expr.rolling_std(full_window(window))
}

/// Sample variance over the trailing `window` observations.
pub fn rolling_variance(expr: Expr, window: usize) -> Expr {
    expr.rolling_var(full_window(window))
}

/// Maximum over the trailing `window` observations.
pub fn rolling_max(expr: Expr, window: usize) -> Expr {
    expr.rolling_max(full_window(window))
}

/// Sample covariance of `a` and `b` over the trailing `window` observations.
///
/// Computed from rolling moments: `(E[ab] - E[a]E[b]) * n / (n - 1)`. A row
/// missing either side leaves the window incomplete.
pub fn rolling_covariance(a: Expr, b: Expr, window: usize) -> Expr {
    if window < 2 {
        return a * b * frame::null_f64();
    }
    let n = window as f64;
    let paired_a = when(b.clone().is_not_null()).then(a.clone()).otherwise(frame::null_f64());
    let paired_b = when(a.clone().is_not_null()).then(b.clone()).otherwise(frame::null_f64());
    (rolling_mean(a * b, window) - rolling_mean(paired_a, window) * rolling_mean(paired_b, window))
        * lit(n / (n - 1.0))
}

/// `expr.shift(skip) / expr.shift(lag + skip) - 1`.
///
/// Lags count rows, so on a resampled table they count periods.
pub fn percent_change(expr: Expr, lag: usize, skip: usize) -> Expr {
    let recent = expr.clone().shift(lit(skip as i64));
    let base = expr.shift(lit((lag + skip) as i64));
    recent / base - lit(1.0)
}

/// `base` raised to a non-negative integer power, one value per row of
/// `base`.
pub fn powi(base: Expr, exponent: usize) -> Expr {
    if exponent == 0 {
        return base * lit(0.0) + lit(1.0);
    }
    (1..exponent).fold(base.clone(), |acc, _| acc * base.clone())
}

/// Reduce `df` to the last non-missing value of each of `columns` per period
/// of `frequency`.
///
/// `df` must be sorted by date and carry the frequency's period-end column.
/// The result has one row per observed period, with the period-end label in
/// the `date` column. Daily data is returned unchanged apart from the
/// column selection.
pub fn resample_last(df: &DataFrame, frequency: DataFrequency, columns: &[&str]) -> Result<DataFrame> {
    let Some(period) = frequency.period_column() else {
        let mut selection = vec![col(frame::DATE)];
        selection.extend(columns.iter().map(|c| col(*c)));
        return Ok(df.clone().lazy().select(selection).collect()?);
    };
    if !frame::has_column(df, period) {
        return Err(FactorError::MissingColumn(period.to_string()));
    }

    let mut selection = vec![col(period).alias(frame::DATE)];
    selection.extend(columns.iter().map(|c| col(*c)));
    let aggs: Vec<Expr> = columns.iter().map(|c| col(*c).drop_nulls().last()).collect();

    Ok(df
        .clone()
        .lazy()
        .select(selection)
        .group_by_stable([col(frame::DATE)])
        .agg(aggs)
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn evaluate(df: &DataFrame, expr: Expr) -> Vec<Option<f64>> {
        let out = df.clone().lazy().select([expr.alias("out")]).collect().unwrap();
        frame::f64_values(&out, "out").unwrap()
    }

    #[test]
    fn test_rolling_sum_requires_full_window() {
        let df = df!["x" => [Some(100.0), Some(105.0), None, Some(90.0), Some(95.0)]].unwrap();
        let result = evaluate(&df, rolling_sum(col("x"), 4));

        assert_eq!(result, vec![None, None, None, None, None]);
    }

    #[test]
    fn test_rolling_sum_ttm() {
        let df = df!["x" => [100.0, 105.0, 110.0, 90.0, 95.0, 100.0, 105.0, 115.0]].unwrap();
        let result = evaluate(&df, rolling_sum(col("x"), 4));

        assert_eq!(result[2], None);
        assert_relative_eq!(result[3].unwrap(), 405.0);
        assert_relative_eq!(result[7].unwrap(), 415.0);
    }

    #[test]
    fn test_percent_change_with_skip() {
        let df = df!["x" => [100.0, 110.0, 121.0, 133.1]].unwrap();

        let plain = evaluate(&df, percent_change(col("x"), 1, 0));
        assert_eq!(plain[0], None);
        assert_relative_eq!(plain[1].unwrap(), 0.1, epsilon = 1e-12);

        let skipped = evaluate(&df, percent_change(col("x"), 2, 1));
        assert_eq!(skipped[2], None);
        // 121 / 100 - 1 at row 3
        assert_relative_eq!(skipped[3].unwrap(), 0.21, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_statistics() {
        let df = df!["x" => [1.0, 3.0, 2.0, 10.0]].unwrap();

        let median = evaluate(&df, rolling_median(col("x"), 3));
        assert_eq!(median[1], None);
        assert_relative_eq!(median[2].unwrap(), 2.0);
        assert_relative_eq!(median[3].unwrap(), 3.0);

        let stdev = evaluate(&df, rolling_stdev(col("x"), 2));
        assert_relative_eq!(stdev[1].unwrap(), 2.0_f64.sqrt(), epsilon = 1e-12);

        let max = evaluate(&df, rolling_max(col("x"), 2));
        assert_relative_eq!(max[2].unwrap(), 3.0);
    }

    #[test]
    fn test_all_missing_window_is_missing() {
        let df = df!["x" => [None::<f64>, None, None]].unwrap();

        assert_eq!(evaluate(&df, rolling_mean(col("x"), 2)), vec![None, None, None]);
        assert_eq!(evaluate(&df, rolling_median(col("x"), 2)), vec![None, None, None]);
    }

    #[test]
    fn test_rolling_covariance_matches_variance() {
        let df = df![
            "a" => [0.01, -0.02, 0.03, 0.015, -0.005],
            "b" => [0.02, -0.04, 0.06, 0.03, -0.01],
        ]
        .unwrap();

        let cov = evaluate(&df, rolling_covariance(col("a"), col("b"), 3));
        let var = evaluate(&df, rolling_variance(col("a"), 3));

        assert_eq!(cov[1], None);
        for i in 2..5 {
            // b = 2a, so cov(a, b) = 2 var(a)
            assert_relative_eq!(cov[i].unwrap(), 2.0 * var[i].unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rolling_covariance_of_missing_window_is_missing() {
        let df = df![
            "a" => [Some(0.01), None, None, None, Some(0.02)],
            "b" => [Some(0.02), Some(0.01), None, Some(0.03), Some(0.04)],
        ]
        .unwrap();

        assert_eq!(evaluate(&df, rolling_covariance(col("a"), col("b"), 3)), vec![None; 5]);
        assert_eq!(evaluate(&df, rolling_covariance(col("a"), col("b"), 1)), vec![None; 5]);
    }

    #[test]
    fn test_powi() {
        let df = df!["x" => [2.0, 0.5]].unwrap();

        assert_eq!(evaluate(&df, powi(col("x"), 0)), vec![Some(1.0), Some(1.0)]);
        assert_eq!(evaluate(&df, powi(col("x"), 3)), vec![Some(8.0), Some(0.125)]);
    }

    #[test]
    fn test_resample_last() {
        let df = df![
            "date" => ["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-29"],
            "month_end" => ["2024-01-31", "2024-01-31", "2024-02-29", "2024-02-29"],
            "adj_close" => [Some(1.0), Some(2.0), Some(3.0), None],
        ]
        .unwrap();

        let result = resample_last(&df, DataFrequency::Monthly, &["adj_close"]).unwrap();

        assert_eq!(result.height(), 2);
        assert_eq!(result.column("date").unwrap().str().unwrap().get(1), Some("2024-02-29"));
        assert_eq!(frame::f64_values(&result, "adj_close").unwrap(), vec![Some(2.0), Some(3.0)]);
    }
}
