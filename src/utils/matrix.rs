//! Matrix and vector helpers used by the model wrappers and diagnostics.

use faer::{Col, Mat};

/// Detect columns that are constant (zero variance) within `tolerance`.
pub fn detect_constant_columns(x: &Mat<f64>, tolerance: f64) -> Vec<bool> {
    let n_rows = x.nrows();

    if n_rows == 0 {
        return vec![true; x.ncols()];
    }

    (0..x.ncols())
        .map(|j| {
            let first = x[(0, j)];
            (1..n_rows).all(|i| (x[(i, j)] - first).abs() < tolerance)
        })
        .collect()
}

/// Center a matrix by subtracting column means.
///
/// Returns the centred matrix together with the column means.
pub fn center_columns(x: &Mat<f64>) -> (Mat<f64>, Col<f64>) {
    let n_rows = x.nrows();
    let means = Col::from_fn(x.ncols(), |j| {
        (0..n_rows).map(|i| x[(i, j)]).sum::<f64>() / n_rows.max(1) as f64
    });
    let centered = Mat::from_fn(n_rows, x.ncols(), |i, j| x[(i, j)] - means[j]);

    (centered, means)
}

/// Prepend a column of ones to `x`.
pub fn design_with_intercept(x: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(x.nrows(), x.ncols() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            x[(i, j - 1)]
        }
    })
}

/// Copy column `j` of `x` into a vector.
pub fn column(x: &Mat<f64>, j: usize) -> Col<f64> {
    Col::from_fn(x.nrows(), |i| x[(i, j)])
}

/// Copy every column of `x` except `skip`.
pub fn drop_column(x: &Mat<f64>, skip: usize) -> Mat<f64> {
    let keep: Vec<usize> = (0..x.ncols()).filter(|&k| k != skip).collect();
    select_columns(x, &keep)
}

/// Copy the listed columns of `x`, in the given order.
pub fn select_columns(x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
    Mat::from_fn(x.nrows(), columns.len(), |i, j| x[(i, columns[j])])
}

/// Arithmetic mean; `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (ddof = 1); `NaN` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Coefficient of determination of `fitted` against `observed`, clamped to [0, 1].
///
/// A constant response that is reproduced exactly scores 1.
pub fn r_squared(observed: &Col<f64>, fitted: &Col<f64>) -> f64 {
    let n = observed.nrows();
    if n == 0 {
        return f64::NAN;
    }

    let y_mean = observed.iter().sum::<f64>() / n as f64;
    let tss: f64 = observed.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    let rss: f64 = observed
        .iter()
        .zip(fitted.iter())
        .map(|(&yi, &fi)| (yi - fi).powi(2))
        .sum();

    if tss > 0.0 {
        (1.0 - rss / tss).clamp(0.0, 1.0)
    } else if rss < 1e-10 {
        1.0
    } else {
        0.0
    }
}

/// True when every entry of `x` and `y` is finite.
pub fn all_finite(x: &Mat<f64>, y: &Col<f64>) -> bool {
    let x_ok = (0..x.ncols()).all(|j| (0..x.nrows()).all(|i| x[(i, j)].is_finite()));
    x_ok && y.iter().all(|v| v.is_finite())
}
