//! Leverage (hat matrix diagonal) calculations.

use faer::{Col, Mat};

use crate::solvers::ModelError;

/// Compute X'X (cross-product matrix).
fn compute_xtx(design: &Mat<f64>) -> Mat<f64> {
    design.transpose() * design
}

/// Compute (X'X)^(-1) of a design matrix using QR decomposition with
/// back-substitution.
///
/// Fails with [`ModelError::SingularMatrix`] when a pivot of R vanishes.
pub fn xtx_inverse(design: &Mat<f64>) -> Result<Mat<f64>, ModelError> {
    let xtx = compute_xtx(design);
    let p = xtx.nrows();
    let qr = xtx.qr();
    let q = qr.compute_Q();
    let r = qr.R().to_owned();
    let qt = q.transpose().to_owned();

    let scale = (0..p).map(|i| r[(i, i)].abs()).fold(0.0_f64, f64::max);
    let tolerance = f64::EPSILON * p as f64 * scale;
    if (0..p).any(|i| r[(i, i)].abs() <= tolerance) {
        return Err(ModelError::SingularMatrix);
    }

    let mut inv = Mat::zeros(p, p);
    for col in 0..p {
        let solution = solve_triangular_column(&r, &qt, col, p);
        for row in 0..p {
            inv[(row, col)] = solution[row];
        }
    }
    Ok(inv)
}

/// Solve for a column of (X'X)^(-1) via back-substitution.
fn solve_triangular_column(r: &Mat<f64>, qt: &Mat<f64>, col: usize, p: usize) -> Vec<f64> {
    let mut solution = vec![0.0; p];

    for i in (0..p).rev() {
        let mut sum = qt[(i, col)];
        for j in (i + 1)..p {
            sum -= r[(i, j)] * solution[j];
        }
        solution[i] = sum / r[(i, i)];
    }

    solution
}

/// Leverage of every row of `design` given its (X'X)^(-1).
///
/// h_ii = x_i' (X'X)^(-1) x_i, clamped to [0, 1].
pub fn leverage_from_design(design: &Mat<f64>, xtx_inv: &Mat<f64>) -> Col<f64> {
    let p = design.ncols();

    Col::from_fn(design.nrows(), |i| {
        let mut h_ii = 0.0;
        for j in 0..p {
            for k in 0..p {
                h_ii += design[(i, j)] * xtx_inv[(j, k)] * design[(i, k)];
            }
        }
        h_ii.clamp(0.0, 1.0)
    })
}

/// Indices of observations with leverage above `threshold`
/// (default 2p/n, p counting the intercept).
pub fn high_leverage_points(
    leverage: &Col<f64>,
    n_params: usize,
    threshold: Option<f64>,
) -> Vec<usize> {
    let n = leverage.nrows();
    let cutoff = threshold.unwrap_or(2.0 * n_params as f64 / n as f64);

    leverage
        .iter()
        .enumerate()
        .filter(|(_, &h)| h > cutoff)
        .map(|(i, _)| i)
        .collect()
}
