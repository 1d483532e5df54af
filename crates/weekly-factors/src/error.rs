//! Error types for factor computations.

use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur during factor computation.
///
/// Missing data is not an error: empty inputs and absent factor inputs are
/// recorded in [`Diagnostics`](crate::Diagnostics) and the run carries on.
/// Only tables whose shape or types cannot be interpreted end up here.
#[derive(Debug, Error)]
pub enum FactorError {
    /// A column the engine itself needs is absent from an input table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Input column exists but has an unusable type or content
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Factor not found in registry
    #[error("Factor not found: {0}")]
    NotFound(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}
