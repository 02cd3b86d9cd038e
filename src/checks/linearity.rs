//! Linearity: does a straight line explain the response?

use tracing::debug;

use crate::checks::{finite, residuals_vs_fitted, verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, AssumptionResult};
use crate::error::Result;
use crate::solvers::ModelType;
use crate::utils::r_squared;

pub const NAME: &str = "linearity";

const RECOMMENDATION: &str = "Consider transforming your features or engineering new ones.";

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &ModelType::ALL,
    description: "R² of fitted against observed values, single predictor only",
    check,
};

/// Register the linearity check.
/// Pass when R² is strictly greater than `r2_threshold`.
///
/// Only defined for a single predictor; wider inputs get a "not applicable"
/// record.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    if ctx.n_features() > 1 {
        return Ok(AssumptionResult::not_applicable(
            NAME,
            "Linearity check not run: only supports one predictor.",
            "Linearity check skipped; only valid for single predictor inputs.",
        ));
    }

    let model = ctx.model()?;
    let residuals = model.residuals()?;
    let fitted = model.fitted()?;
    let config = ctx.config();

    let r2 = finite(NAME, "r_squared", r_squared(ctx.y(), fitted))?;
    let passed = r2 > config.r2_threshold;
    let severity = classify(-r2, &config.severity.r_squared.negated());
    debug!(check = NAME, r2, passed, %severity, "check complete");

    let plot = if ctx.wants_plots() {
        Some(ctx.render_base64(&residuals_vs_fitted(
            residuals,
            fitted,
            "Residuals vs Fitted (Linearity Check)",
        ))?)
    } else {
        None
    };

    Ok(AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(format!("R² = {r2:.2} → {}", verdict(passed)))
        .detail("r_squared", r2)
        .detail("r2_threshold", config.r2_threshold)
        .residuals(residuals)
        .fitted(fitted)
        .plot_base64(plot)
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagnosticsConfig, Severity};
    use crate::plot::SvgRenderer;
    use faer::{Col, Mat};

    fn run(x: &Mat<f64>, y: &Col<f64>, plots: bool) -> AssumptionResult {
        let config = DiagnosticsConfig::default();
        let renderer = SvgRenderer::default();
        let ctx = CheckContext::new(x, y, &config, &renderer).return_plot(plots);
        check(&ctx).expect("check")
    }

    #[test]
    fn test_strong_linear_relation_passes() {
        let x = Mat::from_fn(50, 1, |i, _| i as f64);
        let y = Col::from_fn(50, |i| 1.0 + 3.0 * i as f64 + (i as f64 * 1.7).sin());

        let result = run(&x, &y, true);

        assert!(result.passed());
        assert_eq!(result.severity(), Some(Severity::Low));
        assert!(result.recommendation().is_none());
        assert!(result.summary().starts_with("R² = 1.00"));
        assert!(result.plot_base64().is_some());
        assert_eq!(result.residuals().map(<[f64]>::len), Some(50));
    }

    #[test]
    fn test_noise_only_fails() {
        let x = Mat::from_fn(60, 1, |i, _| i as f64);
        let y = Col::from_fn(60, |i| (i as f64 * 2.3).sin());

        let result = run(&x, &y, false);

        assert!(!result.passed());
        assert_eq!(result.severity(), Some(Severity::High));
        assert_eq!(result.recommendation(), Some(RECOMMENDATION));
        assert!(result.plot_base64().is_none());
    }

    #[test]
    fn test_multiple_predictors_skipped() {
        let x = Mat::from_fn(20, 2, |i, j| (i * (j + 1)) as f64 + (i as f64).cos());
        let y = Col::from_fn(20, |i| i as f64);

        let result = run(&x, &y, false);

        assert!(result.passed());
        assert_eq!(result.severity(), Some(Severity::Low));
        assert!(result.details().contains_key("note"));
        assert!(result.residuals().is_none());
    }
}
