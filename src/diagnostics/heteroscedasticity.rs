//! Breusch-Pagan test for non-constant residual variance.

use faer::{Col, Mat};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::solvers::{least_squares, ModelError, DEFAULT_RANK_TOLERANCE};

/// Outcome of a Breusch-Pagan test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreuschPagan {
    /// Lagrange multiplier statistic, n · R² of the auxiliary regression.
    pub statistic: f64,
    /// Upper-tail χ² probability of the statistic.
    pub p_value: f64,
    /// Degrees of freedom (number of estimated auxiliary slopes).
    pub df: usize,
}

/// Koenker's studentized Breusch-Pagan test.
///
/// Regresses the squared residuals on the predictors (plus an intercept) and
/// compares n · R² with a χ² distribution on as many degrees of freedom as
/// there are estimable predictors. Large statistics (small p-values) indicate
/// heteroscedasticity.
pub fn breusch_pagan(residuals: &Col<f64>, x: &Mat<f64>) -> Result<BreuschPagan, ModelError> {
    let n = residuals.nrows();
    let squared = Col::from_fn(n, |i| residuals[i] * residuals[i]);

    let aux = least_squares(x, &squared, true, DEFAULT_RANK_TOLERANCE)?;
    let mean = squared.iter().sum::<f64>() / n as f64;
    let tss: f64 = squared.iter().map(|s| (s - mean).powi(2)).sum();
    let statistic = if tss > 0.0 {
        n as f64 * (1.0 - aux.rss() / tss).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let df = aux.rank;

    let p_value = if df == 0 {
        1.0
    } else {
        ChiSquared::new(df as f64)
            .map(|dist| dist.sf(statistic))
            .unwrap_or(f64::NAN)
    };

    Ok(BreuschPagan {
        statistic,
        p_value,
        df,
    })
}
