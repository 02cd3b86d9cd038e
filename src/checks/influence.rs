//! Influential observations: Cook's distance, leverage and DFBETAS.

use tracing::debug;

use crate::checks::{finite, verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, AssumptionResult};
use crate::diagnostics::{high_leverage_points, influential_cooks};
use crate::error::{DiagnosticError, Result};
use crate::plot::{PlotData, PlotKind, PlotSpec, ReferenceLine};
use crate::solvers::{Influence, ModelType};

pub const NAME: &str = "influence";

const RECOMMENDATION: &str = "Investigate high-leverage or influential observations. Points with high Cook's Distance, DFBETAs, or leverage may unduly influence the model. Consider robust regression methods or removing these points after further review.";

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &[ModelType::Linear],
    description: "Cook's distance, leverage and DFBETAS of every observation",
    check,
};

/// Pass when the largest Cook's distance, leverage and |DFBETAS| are all at
/// or below their cutoffs.
///
/// Needs a model with the influence capability. The leverage cutoff scales
/// with p/n and the DFBETAS cutoff with 1/√n; severity follows the largest
/// Cook's distance alone. Skipped when fewer than two residual degrees of
/// freedom remain.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    let model = ctx.model()?;
    let capable = model
        .as_influence()
        .ok_or_else(|| DiagnosticError::UnsupportedCapability {
            check: NAME.to_string(),
            capability: "influence",
            model_type: model.model_type(),
        })?;

    let n_observations = model.n_observations();
    let n_parameters = model.summary()?.n_parameters;
    if n_observations <= n_parameters + 1 {
        return Ok(AssumptionResult::not_applicable(
            NAME,
            "Too few residual degrees of freedom: influence not applicable.",
            format!(
                "Influence statistics need at least two residual degrees of freedom; got {n_observations} observations for {n_parameters} parameters."
            ),
        ));
    }

    let influence = capable.influence()?;
    let config = ctx.config();
    let thresholds = &config.influence;

    let n = influence.leverage.nrows();
    let cooks_cutoff = thresholds.cooks_distance;
    let leverage_cutoff = thresholds.leverage_cutoff(influence.n_parameters, n);
    let dfbeta_cutoff = thresholds.dfbeta_cutoff(n);

    let max_cook = finite(
        NAME,
        "max_cooks_distance",
        max_of(influence.cooks_distance.iter().copied()),
    )?;
    let max_leverage = finite(NAME, "max_leverage", max_of(influence.leverage.iter().copied()))?;
    let mean_leverage = influence.leverage.iter().sum::<f64>() / n as f64;
    let dfbetas = &influence.dfbetas;
    let abs_dfbetas = (0..dfbetas.nrows())
        .flat_map(|i| (0..dfbetas.ncols()).map(move |j| dfbetas[(i, j)].abs()));
    let max_dfbeta = finite(NAME, "max_dfbeta", max_of(abs_dfbetas.clone()))?;
    let num_large_dfbetas = abs_dfbetas.filter(|&v| v > dfbeta_cutoff).count();

    let mut flagged = influential_cooks(&influence.cooks_distance, Some(cooks_cutoff));
    flagged.extend(high_leverage_points(
        &influence.leverage,
        influence.n_parameters,
        Some(leverage_cutoff),
    ));
    flagged.sort_unstable();
    flagged.dedup();
    let influential: Vec<String> = flagged.iter().map(|i| i.to_string()).collect();

    let passed =
        max_cook <= cooks_cutoff && max_leverage <= leverage_cutoff && max_dfbeta <= dfbeta_cutoff;
    let severity = classify(max_cook, &config.severity.cooks_distance);
    debug!(
        check = NAME,
        max_cook,
        max_leverage,
        max_dfbeta,
        num_large_dfbetas,
        passed,
        "check complete"
    );

    let plots = if ctx.wants_plots() {
        vec![
            ctx.render(&cooks_stem(influence, cooks_cutoff))?,
            ctx.render(&leverage_vs_residuals(influence))?,
        ]
    } else {
        Vec::new()
    };

    Ok(AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(format!(
            "Max Cook's Distance = {max_cook:.4} → {}",
            verdict(passed)
        ))
        .detail("max_cooks_distance", max_cook)
        .detail("cooks_distance_threshold", cooks_cutoff)
        .detail("max_leverage", max_leverage)
        .detail("leverage_threshold", leverage_cutoff)
        .detail("mean_leverage", mean_leverage)
        .detail("max_dfbeta", max_dfbeta)
        .detail("dfbeta_threshold", dfbeta_cutoff)
        .detail("num_large_dfbetas", num_large_dfbetas)
        .detail("influential_observations", influential)
        .residuals(model.residuals()?)
        .fitted(model.fitted()?)
        .plots(plots)
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}

/// Largest value, `NaN` if any value is `NaN` or there are none.
fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    let mut out = f64::NAN;
    for v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        if out.is_nan() || v > out {
            out = v;
        }
    }
    out
}

fn cooks_stem(influence: &Influence, cutoff: f64) -> PlotSpec {
    let cooks = &influence.cooks_distance;
    PlotSpec::new(
        PlotKind::CooksDistance,
        "Cook's Distance",
        PlotData::Bars {
            x: (0..cooks.nrows()).map(|i| i as f64).collect(),
            heights: cooks.iter().copied().collect(),
            guides: vec![cutoff],
        },
    )
    .labels("Observation Index", "Cook's Distance")
}

fn leverage_vs_residuals(influence: &Influence) -> PlotSpec {
    PlotSpec::new(
        PlotKind::LeverageVsResiduals,
        "Influence Plot (Leverage vs Residuals)",
        PlotData::Scatter {
            x: influence.leverage.iter().copied().collect(),
            y: influence.studentized_residuals.iter().copied().collect(),
            reference: Some(ReferenceLine::horizontal(0.0)),
        },
    )
    .labels("Leverage", "Studentized residuals")
}
