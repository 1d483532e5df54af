//! Per-invocation diagnostics.
//!
//! A [`Diagnostics`] value is created for each security run and threaded
//! through every stage. Nothing is shared between invocations.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Pipeline stage a diagnostic was raised in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Input guard before any computation
    Guard,
    /// Trailing-twelve-month aggregation
    Trailing,
    /// Period-over-period growth
    Growth,
    /// Rolling median and standard deviation of growth
    Dispersion,
    /// Ratios on the quarterly table
    Ratio,
    /// Ratios on the daily table (market capitalisation and yields)
    Valuation,
    /// Price-based factors
    Price,
    /// Consensus revisions
    Consensus,
}

/// Something that kept part of a run from producing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stage that raised it
    pub stage: Stage,
    /// Factor, line item or input table concerned
    pub subject: String,
    /// Columns that were absent; empty when a whole input was empty
    pub missing: Vec<String>,
}

impl Diagnostic {
    /// Whether this diagnostic reports an empty input table.
    pub const fn is_empty_input(&self) -> bool {
        matches!(self.stage, Stage::Guard)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_input() {
            write!(f, "[{}] {} input is empty", self.stage, self.subject)
        } else {
            write!(f, "[{}] {} missing inputs: {}", self.stage, self.subject, self.missing.join(", "))
        }
    }
}

/// Diagnostics collected during one security's run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    ticker: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty collector for `ticker`.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self { ticker: ticker.into(), entries: Vec::new() }
    }

    /// Security the diagnostics belong to.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Record that an input table was empty.
    pub fn empty_input(&mut self, input: &str) {
        info!(ticker = %self.ticker, input, "input is empty, skipping security");
        self.entries.push(Diagnostic {
            stage: Stage::Guard,
            subject: input.to_string(),
            missing: Vec::new(),
        });
    }

    /// Record that `subject` could not be computed because `missing` columns
    /// were absent.
    pub fn missing_columns(&mut self, stage: Stage, subject: &str, missing: Vec<String>) {
        warn!(
            ticker = %self.ticker,
            stage = %stage,
            factor = subject,
            missing = ?missing,
            "not all inputs are available"
        );
        self.entries.push(Diagnostic { stage, subject: subject.to_string(), missing });
    }

    /// All entries in the order they were raised.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Entries concerning one factor or input.
    pub fn for_subject<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| d.subject == subject)
    }

    /// Whether the run was short-circuited by an empty input.
    pub fn has_empty_input(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_empty_input)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_are_local() {
        let mut first = Diagnostics::new("AAPL");
        let second = Diagnostics::new("MSFT");

        first.missing_columns(Stage::Ratio, "roe", vec!["stockholders_equity".to_string()]);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(first.ticker(), "AAPL");
    }

    #[test]
    fn test_empty_input() {
        let mut diagnostics = Diagnostics::new("AAPL");
        diagnostics.empty_input("prices");

        assert!(diagnostics.has_empty_input());
        assert_eq!(diagnostics.entries()[0].to_string(), "[Guard] prices input is empty");
    }

    #[test]
    fn test_for_subject() {
        let mut diagnostics = Diagnostics::new("AAPL");
        diagnostics.missing_columns(Stage::Ratio, "roe", vec!["stockholders_equity".to_string()]);
        diagnostics.missing_columns(Stage::Trailing, "revenue", vec!["revenue".to_string()]);

        let roe: Vec<_> = diagnostics.for_subject("roe").collect();
        assert_eq!(roe.len(), 1);
        assert_eq!(roe[0].to_string(), "[Ratio] roe missing inputs: stockholders_equity");
        assert!(!diagnostics.has_empty_input());
    }
}
