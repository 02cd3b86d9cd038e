//! Multicollinearity: variance inflation of each predictor.

use tracing::debug;

use crate::checks::{verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, worst, AssumptionResult, Severity};
use crate::diagnostics::{correlation_matrix, high_vif_predictors, variance_inflation_factor};
use crate::error::{DiagnosticError, Result};
use crate::plot::{PlotData, PlotKind, PlotSpec};
use crate::solvers::ModelType;

pub const NAME: &str = "multicollinearity";

const RECOMMENDATION: &str = "Consider removing one of the correlated features or combining them into a single feature";

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &ModelType::ALL,
    description: "Variance inflation factor of every predictor",
    check,
};

/// Pass when every VIF is below `vif_threshold`.
///
/// Works on the predictors alone, so it never touches the fitted model and
/// carries no residuals. Exactly collinear predictors get an infinite VIF,
/// which fails with high severity.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    if ctx.n_features() < 2 {
        return Ok(AssumptionResult::not_applicable(
            NAME,
            "Only one predictor: multicollinearity not applicable.",
            "Multicollinearity requires at least two predictor variables.",
        ));
    }

    let config = ctx.config();
    let vif = variance_inflation_factor(ctx.x());
    if vif.iter().any(|v| v.is_nan()) {
        return Err(DiagnosticError::NumericalFailure {
            check: NAME.to_string(),
            metric: "variance_inflation_factor".to_string(),
        });
    }

    let names = ctx.feature_names();
    let max_vif = vif.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let high: Vec<String> = high_vif_predictors(&vif, config.vif_threshold)
        .into_iter()
        .map(|j| names[j].clone())
        .collect();
    let passed = high.is_empty();
    let severity = worst(vif.iter().map(|&v| classify(v, &config.severity.vif)))
        .unwrap_or(Severity::Low);
    debug!(check = NAME, max_vif, n_high = high.len(), passed, "check complete");

    let mut builder = AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(format!(
            "Max VIF among predictors = {max_vif:.2} → {}",
            verdict(passed)
        ));
    for (name, &v) in names.iter().zip(vif.iter()) {
        builder = builder.detail(format!("{name} (VIF)"), v);
    }
    builder = builder
        .detail("max_variance_inflation_factor", max_vif)
        .detail("multicollinearity_vif_threshold", config.vif_threshold)
        .detail("high_vif_features", high);

    if ctx.wants_plots() {
        let corr = correlation_matrix(ctx.x());
        let p = corr.nrows();
        let spec = PlotSpec::new(
            PlotKind::CorrelationHeatmap,
            "Correlation Matrix",
            PlotData::Matrix {
                labels: names.clone(),
                values: (0..p)
                    .map(|i| (0..p).map(|j| corr[(i, j)]).collect())
                    .collect(),
            },
        );
        builder = builder.plot_base64(Some(ctx.render_base64(&spec)?));
    }

    Ok(builder
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}
