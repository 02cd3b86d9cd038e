//! Studentized residuals.

use faer::Col;

/// Compute internally studentized residuals: e_i / (s * sqrt(1 - h_ii)).
pub fn studentized_residuals(residuals: &Col<f64>, leverage: &Col<f64>, mse: f64) -> Col<f64> {
    let n = residuals.nrows();

    if mse <= 0.0 || !mse.is_finite() {
        return Col::from_fn(n, |_| f64::NAN);
    }

    let s = mse.sqrt();

    Col::from_fn(n, |i| {
        let denominator = s * (1.0 - leverage[i]).max(1e-14).sqrt();
        residuals[i] / denominator
    })
}
