//! Homoscedasticity: constant residual variance, by Breusch-Pagan.

use tracing::debug;

use crate::checks::{finite, residuals_vs_fitted, verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, AssumptionResult};
use crate::diagnostics::breusch_pagan;
use crate::error::Result;
use crate::solvers::ModelType;

pub const NAME: &str = "homoscedasticity";

const RECOMMENDATION: &str =
    "Consider using weighted least squares or transforming your response variable.";

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &ModelType::ALL,
    description: "Breusch-Pagan test of residual variance against the predictors",
    check,
};

/// Pass when the Breusch-Pagan p-value exceeds `homoscedasticity_pval`.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    let model = ctx.model()?;
    let residuals = model.residuals()?;
    let fitted = model.fitted()?;
    let config = ctx.config();

    let bp = breusch_pagan(residuals, ctx.x())?;
    let statistic = finite(NAME, "breusch_pagan_stat", bp.statistic)?;
    let p_value = finite(NAME, "breusch_pagan_pval", bp.p_value)?;

    let passed = p_value > config.homoscedasticity_pval;
    let severity = classify(-p_value, &config.severity.p_value.negated());
    debug!(check = NAME, statistic, p_value, df = bp.df, passed, "check complete");

    let plot = if ctx.wants_plots() {
        Some(ctx.render_base64(&residuals_vs_fitted(
            residuals,
            fitted,
            "Residuals vs Fitted (Homoscedasticity Check)",
        ))?)
    } else {
        None
    };

    Ok(AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(format!("Breusch-Pagan p = {p_value:.4} → {}", verdict(passed)))
        .detail("breusch_pagan_stat", statistic)
        .detail("breusch_pagan_pval", p_value)
        .detail("breusch_pagan_df", bp.df)
        .detail(
            "homoscedasticity_pval_threshold",
            config.homoscedasticity_pval,
        )
        .residuals(residuals)
        .fitted(fitted)
        .plot_base64(plot)
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}
