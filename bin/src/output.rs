//! CSV writer for the weekly panel.

use anyhow::{Context, Result};
use std::{io::Write, path::Path};
use weekly_factors::WeeklyFactorRecord;

/// Write `records` with one column per entry of `columns`.
///
/// `ticker`, `date`, `report_date` and `updated_dt` come from the record
/// itself, everything else from its factor map. Missing values are empty.
pub(crate) fn write_records<W: Write>(
    writer: W,
    columns: &[String],
    records: &[WeeklyFactorRecord],
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(columns)?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| match column.as_str() {
                "ticker" => record.ticker.clone(),
                "date" => record.as_of_date.to_string(),
                "report_date" => record.report_date.to_string(),
                "updated_dt" => record.updated_dt.to_string(),
                name => record.factor(name).map(|v| v.to_string()).unwrap_or_default(),
            })
            .collect();
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write to `path`, or to stdout without one.
pub(crate) fn write_panel(
    path: Option<&Path>,
    columns: &[String],
    records: &[WeeklyFactorRecord],
) -> Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_records(file, columns, records)
        }
        None => write_records(std::io::stdout().lock(), columns, records),
    }
}
