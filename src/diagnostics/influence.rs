//! Influence measures: Cook's distance and DFBETAS.

use faer::{Col, Mat};

/// Compute Cook's distance for each observation.
///
/// D_i = (e_i² / (p * MSE)) * (h_ii / (1 - h_ii)²)
pub fn cooks_distance(
    residuals: &Col<f64>,
    leverage: &Col<f64>,
    mse: f64,
    n_params: usize,
) -> Col<f64> {
    let n = residuals.nrows();

    if mse <= 0.0 || !mse.is_finite() || n_params == 0 {
        return Col::from_fn(n, |_| f64::NAN);
    }

    Col::from_fn(n, |i| {
        let e_i = residuals[i];
        let h_ii = leverage[i];
        let one_minus_h = (1.0 - h_ii).max(1e-14);

        let d_i = (e_i * e_i / (n_params as f64 * mse)) * (h_ii / (one_minus_h * one_minus_h));

        if d_i.is_finite() {
            d_i.max(0.0)
        } else {
            f64::NAN
        }
    })
}

/// Standardized DFBETAS for every observation and parameter.
///
/// For observation i and parameter j:
///
/// DFBETAS_ij = [(X'X)^(-1) x_i]_j * e_i / (1 - h_ii) / (s_(i) * sqrt([(X'X)^(-1)]_jj))
///
/// where s_(i) is the leave-one-out residual standard error. `design` must
/// contain the intercept column when the model has one.
pub fn dfbetas(
    design: &Mat<f64>,
    xtx_inv: &Mat<f64>,
    residuals: &Col<f64>,
    leverage: &Col<f64>,
    mse: f64,
    n_params: usize,
) -> Mat<f64> {
    let n = design.nrows();
    let p = design.ncols();
    let df_resid = n.saturating_sub(n_params);

    if df_resid <= 1 || mse <= 0.0 || !mse.is_finite() {
        return Mat::from_fn(n, p, |_, _| f64::NAN);
    }

    let rss = mse * df_resid as f64;
    let df_loo = (df_resid - 1) as f64;

    let mut out = Mat::zeros(n, p);
    for i in 0..n {
        let e_i = residuals[i];
        let one_minus_h = (1.0 - leverage[i]).max(1e-14);
        let mse_loo = (rss - e_i * e_i / one_minus_h) / df_loo;

        for j in 0..p {
            let scale = xtx_inv[(j, j)];
            if mse_loo <= 0.0 || scale <= 0.0 {
                out[(i, j)] = f64::NAN;
                continue;
            }

            let mut row_term = 0.0;
            for k in 0..p {
                row_term += xtx_inv[(j, k)] * design[(i, k)];
            }
            let dfbeta = row_term * e_i / one_minus_h;
            out[(i, j)] = dfbeta / (mse_loo.sqrt() * scale.sqrt());
        }
    }

    out
}

/// Identify influential observations based on Cook's distance.
///
/// Returns indices of observations with D_i > threshold (default 4/n).
pub fn influential_cooks(cooks_d: &Col<f64>, threshold: Option<f64>) -> Vec<usize> {
    let n = cooks_d.nrows();
    let cutoff = threshold.unwrap_or(4.0 / n as f64);

    cooks_d
        .iter()
        .enumerate()
        .filter(|(_, &d)| d.is_finite() && d > cutoff)
        .map(|(i, _)| i)
        .collect()
}
