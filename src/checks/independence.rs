//! Independence of residuals, by Durbin-Watson.

use tracing::debug;

use crate::checks::{finite, residuals_vs_fitted, verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, AssumptionResult};
use crate::diagnostics::{autocorrelation, durbin_watson};
use crate::error::Result;
use crate::plot::{PlotData, PlotKind, PlotSpec};
use crate::solvers::ModelType;

pub const NAME: &str = "independence";

const RECOMMENDATION: &str = "Check for autocorrelation in residuals. Consider using time series models (e.g., ARIMA) or adding lag features.";

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &ModelType::ALL,
    description: "Durbin-Watson test for first-order autocorrelation of the residuals",
    check,
};

/// Pass when the Durbin-Watson statistic lies inside the configured band.
///
/// Severity grows with the distance of the statistic from 2.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    let model = ctx.model()?;
    let residuals = model.residuals()?;
    let fitted = model.fitted()?;
    let config = ctx.config();
    let band = config.durbin_watson;

    let dw = finite(NAME, "durbin_watson", durbin_watson(residuals))?;
    let passed = band.contains(dw);
    let severity = classify((dw - 2.0).abs(), &config.severity.durbin_watson);
    debug!(check = NAME, dw, passed, %severity, "check complete");

    let plots = if ctx.wants_plots() {
        let acf = autocorrelation(residuals, config.acf_lags);
        let bound = 1.96 / (residuals.nrows() as f64).sqrt();
        let acf_spec = PlotSpec::new(
            PlotKind::Acf,
            "Autocorrelation of Residuals",
            PlotData::Bars {
                x: (0..acf.len()).map(|k| k as f64).collect(),
                heights: acf,
                guides: vec![bound, -bound],
            },
        )
        .labels("Lag", "Autocorrelation");

        vec![
            ctx.render(&residuals_vs_fitted(
                residuals,
                fitted,
                "Residuals vs Fitted (Independence Check)",
            ))?,
            ctx.render(&acf_spec)?,
        ]
    } else {
        Vec::new()
    };

    Ok(AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(format!(
            "Durbin-Watson statistic = {dw:.4} → {}",
            verdict(passed)
        ))
        .detail("durbin_watson", dw)
        .detail(
            "expected_range",
            format!("{}-{}", band.lower, band.upper),
        )
        .residuals(residuals)
        .fitted(fitted)
        .plots(plots)
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}
