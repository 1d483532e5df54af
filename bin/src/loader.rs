//! CSV inputs laid out per ticker under one data directory.
//!
//! ```text
//! <data-dir>/prices/<TICKER>.csv       date,open,high,low,close,adj_close,volume
//! <data-dir>/statements/<TICKER>.csv   as_of_date,report_date,<line items>
//! <data-dir>/consensus/<TICKER>.csv    date,target_median_price
//! ```
//!
//! Empty cells are missing values. A missing consensus file means no
//! consensus; prices and statements must exist.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use weekly_factors::{ConsensusRecord, PriceBar, QuarterlyStatementRecord, SecurityInput};

/// Root of the per-ticker CSV tree.
#[derive(Debug, Clone)]
pub(crate) struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, table: &str, ticker: &str) -> PathBuf {
        self.root.join(table).join(format!("{ticker}.csv"))
    }

    /// Daily bars of `ticker`.
    pub(crate) fn prices(&self, ticker: &str) -> Result<Vec<PriceBar>> {
        let mut bars: Vec<PriceBar> = read_csv(&self.path("prices", ticker))?;
        for bar in &mut bars {
            bar.ticker = ticker.to_string();
        }
        Ok(bars)
    }

    /// Quarterly statements of `ticker`.
    pub(crate) fn statements(&self, ticker: &str) -> Result<Vec<QuarterlyStatementRecord>> {
        let mut records: Vec<QuarterlyStatementRecord> = read_csv(&self.path("statements", ticker))?;
        for record in &mut records {
            record.ticker = ticker.to_string();
        }
        Ok(records)
    }

    /// Consensus updates of `ticker`, empty without a file.
    pub(crate) fn consensus(&self, ticker: &str) -> Result<Vec<ConsensusRecord>> {
        let path = self.path("consensus", ticker);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_csv(&path)
    }

    /// Everything one run needs about `ticker`.
    pub(crate) fn security(&self, ticker: &str) -> Result<SecurityInput> {
        Ok(SecurityInput {
            ticker: ticker.to_string(),
            prices: self.prices(ticker)?,
            statements: self.statements(ticker)?,
            consensus: self.consensus(ticker)?,
        })
    }
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .with_context(|| format!("failed to parse {}", path.display()))
}
