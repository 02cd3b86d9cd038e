//! Regression assumption diagnostics.
//!
//! Fit a linear (or robust) model once, then check the assumptions its
//! inference rests on: linearity, homoscedasticity, normality of residuals,
//! absence of multicollinearity, independence of residuals and absence of
//! overly influential observations. Each check reports pass/fail, a severity
//! grade, the statistics behind the verdict and, on failure, a remediation
//! hint.
//!
//! # Example
//!
//! ```rust,ignore
//! use regcheck::prelude::*;
//!
//! let dispatcher = Dispatcher::new(
//!     CheckRegistry::with_builtin_checks(),
//!     DiagnosticsConfig::builder().vif_threshold(10.0).build()?,
//! )
//! .with_feature_names(["size", "age"]);
//!
//! let (results, _model) = dispatcher.run_all(&x, &y, ModelType::Linear, true)?;
//! for result in results.failed() {
//!     println!("{}: {}", result.name(), result.summary());
//! }
//! println!("{}", serde_json::to_string_pretty(&results)?);
//! ```

pub mod checks;
pub mod core;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod plot;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::checks::{CheckContext, CheckEntry, CheckRegistry};
    pub use crate::core::{
        AssumptionResult, DetailValue, DiagnosticsConfig, FailurePolicy, Flag, Severity,
        SeverityThresholds,
    };
    pub use crate::dispatcher::{CheckResults, Dispatcher, Predictors};
    pub use crate::error::{DiagnosticError, Result};
    pub use crate::plot::{PlotRenderer, SvgRenderer};
    pub use crate::solvers::{
        fit_model, HuberModel, InfluenceCapable, ModelType, ModelWrapper, OlsModel,
    };
}

pub use crate::checks::{CheckRegistry, BUILTIN_CHECKS};
pub use crate::core::{AssumptionResult, DiagnosticsConfig, Severity};
pub use crate::dispatcher::{CheckResults, Dispatcher};
pub use crate::error::{DiagnosticError, Result};
pub use crate::solvers::{ModelType, ModelWrapper};
