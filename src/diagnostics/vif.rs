//! Variance Inflation Factor (VIF) and predictor correlation.

use faer::{Col, Mat};

use crate::solvers::{least_squares, DEFAULT_RANK_TOLERANCE};
use crate::utils::{column, drop_column, r_squared};

/// Compute Variance Inflation Factor for each predictor.
///
/// VIF_j = 1 / (1 - R²_j), where R²_j is the R² from regressing x_j on all
/// other predictors (with an intercept).
///
/// # Interpretation
/// - VIF = 1: No correlation with other predictors
/// - VIF > 5: Moderate multicollinearity
/// - VIF > 10: High multicollinearity
///
/// Perfectly collinear predictors get `f64::INFINITY`.
pub fn variance_inflation_factor(x: &Mat<f64>) -> Col<f64> {
    let n = x.nrows();
    let p = x.ncols();

    if n < 3 || p < 2 {
        return Col::from_fn(p, |_| 1.0);
    }

    Col::from_fn(p, |j| {
        let x_other = drop_column(x, j);
        let y_j = column(x, j);

        match least_squares(&x_other, &y_j, true, DEFAULT_RANK_TOLERANCE) {
            Ok(fit) => {
                let r2 = r_squared(&y_j, &fit.fitted);
                let vif_j = if r2 < 1.0 - 1e-14 {
                    1.0 / (1.0 - r2)
                } else {
                    f64::INFINITY
                };
                vif_j.max(1.0)
            }
            // If regression fails, assume no collinearity
            Err(_) => 1.0,
        }
    })
}

/// Identify predictors with high multicollinearity.
///
/// Returns indices of predictors with VIF at or above `threshold`.
pub fn high_vif_predictors(vif: &Col<f64>, threshold: f64) -> Vec<usize> {
    vif.iter()
        .enumerate()
        .filter(|(_, &v)| v >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Pearson correlation matrix of the predictor columns.
///
/// Constant columns correlate 0 with everything except themselves.
pub fn correlation_matrix(x: &Mat<f64>) -> Mat<f64> {
    let n = x.nrows();
    let p = x.ncols();

    let means: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| x[(i, j)]).sum::<f64>() / n.max(1) as f64)
        .collect();
    let norms: Vec<f64> = (0..p)
        .map(|j| {
            (0..n)
                .map(|i| (x[(i, j)] - means[j]).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    Mat::from_fn(p, p, |a, b| {
        if a == b {
            return 1.0;
        }
        if norms[a] == 0.0 || norms[b] == 0.0 {
            return 0.0;
        }
        let cross: f64 = (0..n)
            .map(|i| (x[(i, a)] - means[a]) * (x[(i, b)] - means[b]))
            .sum();
        (cross / (norms[a] * norms[b])).clamp(-1.0, 1.0)
    })
}
