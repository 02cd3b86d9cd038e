//! Core types shared by every check: result records, severity grading and
//! configuration.

mod config;
mod result;
mod severity;

pub use config::{
    ConfigError, DiagnosticsConfig, DiagnosticsConfigBuilder, DurbinWatsonBand, FailurePolicy,
    InfluenceThresholds, SeverityTables,
};
pub use result::{
    AssumptionResult, AssumptionResultBuilder, DetailValue, Details, Flag, PlotImage,
};
pub use severity::{classify, worst, Severity, SeverityThresholds};
