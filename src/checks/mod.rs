//! Assumption checks and the registry that holds them.
//!
//! Every check follows the same steps: skip degenerate inputs with a passing
//! "not applicable" record, read what it needs from the fitted model, compute
//! its statistic, compare it with the configured threshold, grade the
//! severity and optionally attach figures.

mod context;
mod registry;

pub mod homoscedasticity;
pub mod independence;
pub mod influence;
pub mod linearity;
pub mod multicollinearity;
pub mod normality;

pub use context::CheckContext;
pub use registry::{CheckEntry, CheckFn, CheckRegistry};

use faer::Col;

use crate::core::AssumptionResult;
use crate::error::{DiagnosticError, Result};
use crate::plot::{PlotData, PlotKind, PlotSpec, ReferenceLine};
use crate::solvers::ModelType;

/// Static description of a check shipped with the crate.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinCheck {
    pub name: &'static str,
    pub model_types: &'static [ModelType],
    pub description: &'static str,
    pub check: fn(&CheckContext<'_>) -> Result<AssumptionResult>,
}

/// The built-in checks, in the order they run.
pub const BUILTIN_CHECKS: [BuiltinCheck; 6] = [
    linearity::CHECK,
    homoscedasticity::CHECK,
    normality::CHECK,
    multicollinearity::CHECK,
    independence::CHECK,
    influence::CHECK,
];

/// Reject `NaN` and infinite statistics.
pub(crate) fn finite(check: &str, metric: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DiagnosticError::NumericalFailure {
            check: check.to_string(),
            metric: metric.to_string(),
        })
    }
}

pub(crate) fn verdict(passed: bool) -> &'static str {
    if passed {
        "Pass"
    } else {
        "Fail"
    }
}

/// Residuals against fitted values with a dashed zero line.
pub(crate) fn residuals_vs_fitted(
    residuals: &Col<f64>,
    fitted: &Col<f64>,
    title: &str,
) -> PlotSpec {
    PlotSpec::new(
        PlotKind::ResidualsVsFitted,
        title,
        PlotData::Scatter {
            x: fitted.iter().copied().collect(),
            y: residuals.iter().copied().collect(),
            reference: Some(ReferenceLine::horizontal(0.0)),
        },
    )
    .labels("Fitted values", "Residuals")
}
