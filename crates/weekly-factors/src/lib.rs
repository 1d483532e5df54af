#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/weekly-factors/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod consensus;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod frame;
pub mod fundamentals;
pub mod price;
pub mod ratio;
pub mod registry;
pub mod traits;
pub mod types;
pub mod window;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export core types
pub use config::{ConsensusConfig, EngineConfig, FundamentalConfig, PriceConfig, RatioConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use engine::{FactorEngine, FactorOutput, InputFrames, RunContext};
pub use error::{FactorError, Result};
pub use registry::{FactorCategory, FactorInfo, FactorRegistry};
pub use traits::{ConfigurableFactor, DailyFactor, DailyInputs, DataFrequency, Factor, FactorConfig, InputSource};
pub use types::{
    CalendarRow, ConsensusRecord, LineItem, PriceBar, QuarterlyStatementRecord, SecurityInput,
    WeeklyFactorRecord, daily_calendar,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
