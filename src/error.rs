//! Crate-level error type.

use thiserror::Error;

use crate::core::ConfigError;
use crate::plot::PlotError;
use crate::solvers::{ModelError, ModelType};

/// Errors raised by the registry, the dispatcher and individual checks.
///
/// Degenerate inputs (a single predictor for the multicollinearity check, too
/// few observations for the normality tests) are not errors: the check
/// returns a passing "not applicable" record instead.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("unknown check '{0}'")]
    UnknownCheck(String),

    #[error("a check named '{0}' is already registered")]
    DuplicateCheck(String),

    #[error("unknown model type '{0}'; expected 'linear' or 'robust'")]
    UnknownModelType(String),

    #[error("check '{check}' needs the {capability} capability, which {model_type} models do not provide")]
    UnsupportedCapability {
        check: String,
        capability: &'static str,
        model_type: ModelType,
    },

    #[error("check '{check}' produced a non-finite {metric}")]
    NumericalFailure { check: String, metric: String },

    #[error("check registered as '{check}' returned a result named '{returned}'")]
    MisnamedResult { check: String, returned: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiagnosticError>;
