//! Runs registered checks against one fitted model.
//!
//! A [`Dispatcher`] owns a [`CheckRegistry`], a [`DiagnosticsConfig`] and a
//! [`PlotRenderer`]. [`Dispatcher::run_all`] fits exactly one model for the
//! session, runs every check registered for its model type in registration
//! order and hands back both the ordered results and the fitted model.
//!
//! # Example
//!
//! ```rust,ignore
//! use regcheck::prelude::*;
//!
//! let dispatcher = Dispatcher::default();
//! let (results, model) = dispatcher.run_all(&x, &y, ModelType::Linear, false)?;
//!
//! println!("R² = {:.3}", model.summary()?.r_squared);
//! for (name, result) in results.iter() {
//!     println!("{name}: {}", result.summary());
//! }
//! ```

use faer::{Col, Mat};
use rayon::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info, warn};

use crate::checks::{CheckContext, CheckEntry, CheckRegistry};
use crate::core::{worst, AssumptionResult, DiagnosticsConfig, FailurePolicy, Severity};
use crate::error::Result;
use crate::plot::{PlotRenderer, SvgRenderer};
use crate::solvers::{fit_model, ModelType, ModelWrapper};

/// Predictor input: one column or a matrix of columns.
#[derive(Debug, Clone, Copy)]
pub enum Predictors<'a> {
    Single(&'a Col<f64>),
    Multiple(&'a Mat<f64>),
}

impl Predictors<'_> {
    /// The predictors as an n × p matrix.
    pub fn to_matrix(&self) -> Mat<f64> {
        match self {
            Predictors::Single(col) => Mat::from_fn(col.nrows(), 1, |i, _| col[i]),
            Predictors::Multiple(mat) => (*mat).clone(),
        }
    }
}

impl<'a> From<&'a Col<f64>> for Predictors<'a> {
    fn from(col: &'a Col<f64>) -> Self {
        Predictors::Single(col)
    }
}

impl<'a> From<&'a Mat<f64>> for Predictors<'a> {
    fn from(mat: &'a Mat<f64>) -> Self {
        Predictors::Multiple(mat)
    }
}

/// Ordered results of a diagnostic run, keyed by check name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResults {
    entries: Vec<(String, AssumptionResult)>,
}

impl CheckResults {
    fn push(&mut self, name: String, result: AssumptionResult) {
        self.entries.push((name, result));
    }

    pub fn get(&self, name: &str) -> Option<&AssumptionResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssumptionResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every check passed. True for an empty run.
    pub fn all_passed(&self) -> bool {
        self.entries.iter().all(|(_, r)| r.passed())
    }

    /// Results that did not pass, in run order.
    pub fn failed(&self) -> Vec<&AssumptionResult> {
        self.entries
            .iter()
            .map(|(_, r)| r)
            .filter(|r| !r.passed())
            .collect()
    }

    /// Highest severity over all results that carry one.
    pub fn worst_severity(&self) -> Option<Severity> {
        worst(self.entries.iter().filter_map(|(_, r)| r.severity()))
    }
}

impl Serialize for CheckResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, result) in &self.entries {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

/// Session driver: fits the model once and runs the applicable checks.
#[derive(Debug)]
pub struct Dispatcher {
    registry: CheckRegistry,
    config: DiagnosticsConfig,
    renderer: Box<dyn PlotRenderer>,
    feature_names: Vec<String>,
}

impl Default for Dispatcher {
    /// Built-in checks with the default configuration.
    fn default() -> Self {
        Self::new(CheckRegistry::with_builtin_checks(), DiagnosticsConfig::default())
    }
}

impl Dispatcher {
    pub fn new(registry: CheckRegistry, config: DiagnosticsConfig) -> Self {
        Self {
            registry,
            config,
            renderer: Box::new(SvgRenderer::default()),
            feature_names: Vec::new(),
        }
    }

    /// Names used for per-predictor details; missing names fall back to
    /// `x0`, `x1`, ...
    pub fn with_feature_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the default SVG renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn PlotRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Fit one model of `model_type` and run every check registered for it.
    ///
    /// Results come back in registration order whether or not the checks ran
    /// in parallel. A failing check aborts the run or is recorded as a
    /// critical result, depending on [`DiagnosticsConfig::failure_policy`].
    pub fn run_all<'a>(
        &self,
        x: impl Into<Predictors<'a>>,
        y: &Col<f64>,
        model_type: ModelType,
        return_plot: bool,
    ) -> Result<(CheckResults, Box<dyn ModelWrapper>)> {
        self.config.validate()?;
        let x = x.into().to_matrix();
        let model = fit_model(model_type, &x, y)?;
        let entries = self.registry.all_for_model_type(model_type);
        debug!(
            %model_type,
            n_observations = y.nrows(),
            n_features = x.ncols(),
            n_checks = entries.len(),
            parallel = self.config.parallel,
            "running diagnostics"
        );

        let run = |entry: &&CheckEntry| {
            let ctx = self.context(&x, y, return_plot).with_model(model.as_ref());
            entry.run(&ctx)
        };
        let outcomes: Vec<Result<AssumptionResult>> = if self.config.parallel {
            entries.par_iter().map(run).collect()
        } else {
            entries.iter().map(run).collect()
        };

        let mut results = CheckResults::default();
        for (entry, outcome) in entries.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        warn!(check = entry.name(), error = %err, "check failed; aborting run");
                        return Err(err);
                    }
                    FailurePolicy::Isolate => {
                        warn!(check = entry.name(), error = %err, "check failed; recording error");
                        AssumptionResult::errored(entry.name(), &err)
                    }
                },
            };
            if !result.passed() {
                debug!(check = entry.name(), summary = result.summary(), "check did not pass");
            }
            results.push(entry.name().to_string(), result);
        }

        info!(
            %model_type,
            n_checks = results.len(),
            n_failed = results.failed().len(),
            worst = ?results.worst_severity(),
            "diagnostics complete"
        );
        Ok((results, model))
    }

    /// Run the single check `name`, fitting a linear model for it on demand.
    ///
    /// Unknown names fail with [`DiagnosticError::UnknownCheck`]. Errors
    /// from the check are returned as-is regardless of the failure policy.
    ///
    /// [`DiagnosticError::UnknownCheck`]: crate::DiagnosticError::UnknownCheck
    pub fn run_one<'a>(
        &self,
        name: &str,
        x: impl Into<Predictors<'a>>,
        y: &Col<f64>,
        return_plot: bool,
    ) -> Result<AssumptionResult> {
        let entry = self.registry.get(name)?;
        self.config.validate()?;
        let x = x.into().to_matrix();
        entry.run(&self.context(&x, y, return_plot))
    }

    fn context<'s>(
        &'s self,
        x: &'s Mat<f64>,
        y: &'s Col<f64>,
        return_plot: bool,
    ) -> CheckContext<'s> {
        let ctx = CheckContext::new(x, y, &self.config, self.renderer.as_ref())
            .return_plot(return_plot);
        if self.feature_names.is_empty() {
            ctx
        } else {
            ctx.with_feature_names(&self.feature_names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticError;

    fn line(n: usize) -> (Col<f64>, Col<f64>) {
        let x = Col::from_fn(n, |i| i as f64);
        let y = Col::from_fn(n, |i| 1.0 + 2.0 * i as f64 + ((i * i) as f64 * 0.7).sin());
        (x, y)
    }

    #[test]
    fn test_single_column_predictors() {
        let col = Col::from_fn(3, |i| i as f64 + 1.0);
        let mat = Predictors::from(&col).to_matrix();
        assert_eq!(mat.nrows(), 3);
        assert_eq!(mat.ncols(), 1);
        assert_eq!(mat[(2, 0)], 3.0);
    }

    #[test]
    fn test_run_all_follows_registration_order() {
        let (x, y) = line(60);
        let (results, model) = Dispatcher::default()
            .run_all(&x, &y, ModelType::Linear, false)
            .expect("run");

        assert_eq!(
            results.names(),
            vec![
                "linearity",
                "homoscedasticity",
                "normality",
                "multicollinearity",
                "independence",
                "influence"
            ]
        );
        assert!(model.is_fitted());
        assert_eq!(model.model_type(), ModelType::Linear);
    }

    #[test]
    fn test_robust_run_skips_influence() {
        let (x, y) = line(60);
        let (results, model) = Dispatcher::default()
            .run_all(&x, &y, ModelType::Robust, false)
            .expect("run");

        assert_eq!(results.len(), 5);
        assert!(results.get("influence").is_none());
        assert_eq!(model.model_type(), ModelType::Robust);
    }

    #[test]
    fn test_run_one_unknown_name() {
        let (x, y) = line(20);
        let err = Dispatcher::default()
            .run_one("banana", &x, &y, false)
            .expect_err("unknown");
        assert!(matches!(err, DiagnosticError::UnknownCheck(name) if name == "banana"));
    }

    #[test]
    fn test_fit_errors_abort_before_checks() {
        let x = Col::from_fn(10, |i| i as f64);
        let y = Col::from_fn(9, |i| i as f64);
        let err = Dispatcher::default()
            .run_all(&x, &y, ModelType::Linear, false)
            .expect_err("mismatch");
        assert!(matches!(err, DiagnosticError::Model(_)));
    }

    #[test]
    fn test_results_aggregates() {
        let mut results = CheckResults::default();
        assert!(results.all_passed());
        assert_eq!(results.worst_severity(), None);

        results.push(
            "a".into(),
            AssumptionResult::builder("a")
                .passed(true)
                .severity(Severity::Low)
                .build(),
        );
        results.push(
            "b".into(),
            AssumptionResult::builder("b")
                .passed(false)
                .severity(Severity::Moderate)
                .build(),
        );

        assert!(!results.all_passed());
        assert_eq!(results.failed().len(), 1);
        assert_eq!(results.failed()[0].name(), "b");
        assert_eq!(results.worst_severity(), Some(Severity::Moderate));
    }
}
