//! Normality of residuals by majority vote of three tests.

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::checks::{finite, verdict, BuiltinCheck, CheckContext};
use crate::core::{classify, worst, AssumptionResult, Severity, SeverityThresholds};
use crate::diagnostics::{anderson_darling, dagostino_pearson, shapiro_wilk};
use crate::error::Result;
use crate::plot::{PlotData, PlotKind, PlotSpec, ReferenceLine};
use crate::solvers::ModelType;
use crate::utils::{mean, sample_variance};

pub const NAME: &str = "normality";

/// Fewest residuals the D'Agostino-Pearson test accepts.
pub const MIN_OBSERVATIONS: usize = 8;

const RECOMMENDATION: &str = "Consider log-transforming Y or using robust regression.";

const TESTS_USED: [&str; 3] = [
    "Shapiro-Wilk (tests overall shape)",
    "D'Agostino-Pearson (tests skew/kurtosis)",
    "Anderson-Darling (emphasizes tails)",
];

pub const CHECK: BuiltinCheck = BuiltinCheck {
    name: NAME,
    model_types: &ModelType::ALL,
    description: "Shapiro-Wilk, D'Agostino-Pearson and Anderson-Darling on the residuals",
    check,
};

/// Pass when at least two of the three tests do not reject normality.
///
/// Shapiro-Wilk and D'Agostino-Pearson reject at `normality_pval`;
/// Anderson-Darling rejects when A² reaches its 5% critical value. The
/// severity is the worst of the three individual grades.
pub fn check(ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
    let model = ctx.model()?;
    let residuals = model.residuals()?;
    let fitted = model.fitted()?;
    let config = ctx.config();
    let alpha = config.normality_pval;

    let values: Vec<f64> = residuals.iter().copied().collect();
    if values.len() < MIN_OBSERVATIONS {
        return Ok(AssumptionResult::not_applicable(
            NAME,
            format!(
                "Normality check not run: at least {MIN_OBSERVATIONS} residuals are required."
            ),
            format!(
                "Only {} residuals available; the normality tests need at least {MIN_OBSERVATIONS}.",
                values.len()
            ),
        ));
    }

    let shapiro = shapiro_wilk(&values)?;
    let dagostino = dagostino_pearson(&values)?;
    let anderson = anderson_darling(&values)?;

    let shapiro_p = finite(NAME, "shapiro_pval", shapiro.p_value)?;
    let dagostino_p = finite(NAME, "dagostino_pval", dagostino.p_value)?;
    let anderson_stat = finite(NAME, "anderson_stat", anderson.statistic)?;
    // critical values are tabulated at 15, 10, 5, 2.5 and 1 percent
    let [crit_15, _, crit_5, _, crit_1] = anderson.critical_values;

    let shapiro_passed = shapiro_p > alpha;
    let dagostino_passed = dagostino_p > alpha;
    let anderson_passed = anderson.passes_at(5.0);
    let tests_passed = [shapiro_passed, dagostino_passed, anderson_passed]
        .iter()
        .filter(|&&p| p)
        .count();
    let passed = tests_passed >= 2;

    let p_table = config.severity.p_value.negated();
    let severity = worst([
        classify(-shapiro_p, &p_table),
        classify(-dagostino_p, &p_table),
        classify(anderson_stat, &SeverityThresholds::new(crit_1, crit_5, crit_15)),
    ])
    .unwrap_or(Severity::Low);

    debug!(
        check = NAME,
        shapiro_p,
        dagostino_p,
        anderson_stat,
        tests_passed,
        passed,
        "check complete"
    );

    let summary = format!(
        "Shapiro-Wilk p = {shapiro_p:.4} → {}, D'Agostino p = {dagostino_p:.4} → {}, \
         Anderson stat = {anderson_stat:.4} (crit = {crit_5:.4}) → {} | Overall → {}",
        verdict(shapiro_passed),
        verdict(dagostino_passed),
        verdict(anderson_passed),
        verdict(passed),
    );

    let plots = if ctx.wants_plots() {
        vec![
            ctx.render(&qq_plot(&values))?,
            ctx.render(&histogram(&values, config.histogram_bins))?,
        ]
    } else {
        Vec::new()
    };

    Ok(AssumptionResult::builder(NAME)
        .passed(passed)
        .summary(summary)
        .detail("shapiro_pval", shapiro_p)
        .detail("dagostino_pval", dagostino_p)
        .detail("anderson_stat", anderson_stat)
        .detail("anderson_critical_5pct", crit_5)
        .detail("normality_pval_threshold", alpha)
        .detail("tests_passed", tests_passed)
        .detail(
            "tests_used",
            TESTS_USED.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .residuals(residuals)
        .fitted(fitted)
        .plots(plots)
        .severity(severity)
        .recommendation(RECOMMENDATION)
        .build())
}

/// Standardized residuals against standard normal quantiles.
fn qq_plot(values: &[f64]) -> PlotSpec {
    let n = values.len();
    let m = mean(values);
    let sd = sample_variance(values).sqrt();
    let scale = if sd > 0.0 { sd } else { 1.0 };

    let mut sample: Vec<f64> = values.iter().map(|v| (v - m) / scale).collect();
    sample.sort_by(|a, b| a.total_cmp(b));

    let norm = Normal::standard();
    let theoretical = (0..n)
        .map(|i| norm.inverse_cdf((i as f64 + 0.5) / n as f64))
        .collect();

    PlotSpec::new(
        PlotKind::QQ,
        "Q-Q Plot",
        PlotData::Scatter {
            x: theoretical,
            y: sample,
            reference: Some(ReferenceLine {
                intercept: 0.0,
                slope: 1.0,
            }),
        },
    )
    .labels("Theoretical quantiles", "Standardized residuals")
}

fn histogram(values: &[f64], bins: usize) -> PlotSpec {
    let bins = bins.max(1);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };

    let mut counts = vec![0.0; bins];
    for &v in values {
        let k = (((v - lo) / width) as usize).min(bins - 1);
        counts[k] += 1.0;
    }
    let centers = (0..bins).map(|k| lo + (k as f64 + 0.5) * width).collect();

    PlotSpec::new(
        PlotKind::Histogram,
        "Histogram",
        PlotData::Bars {
            x: centers,
            heights: counts,
            guides: Vec::new(),
        },
    )
    .labels("Residual", "Count")
}
