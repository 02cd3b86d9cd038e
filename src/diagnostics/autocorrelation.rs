//! Serial correlation of residuals: Durbin-Watson and the ACF.

use faer::Col;

/// Durbin-Watson statistic: Σ (e_t - e_{t-1})² / Σ e_t².
///
/// Ranges over [0, 4]; values near 2 indicate no first-order
/// autocorrelation. Returns `NaN` when the residuals are all zero.
pub fn durbin_watson(residuals: &Col<f64>) -> f64 {
    let n = residuals.nrows();
    let ss: f64 = residuals.iter().map(|e| e * e).sum();

    if n < 2 || ss <= 0.0 {
        return f64::NAN;
    }

    let diff: f64 = (1..n)
        .map(|t| (residuals[t] - residuals[t - 1]).powi(2))
        .sum();
    diff / ss
}

/// Sample autocorrelation function for lags `0..=max_lag`.
///
/// Lags beyond the series length are omitted.
pub fn autocorrelation(residuals: &Col<f64>, max_lag: usize) -> Vec<f64> {
    let n = residuals.nrows();
    if n == 0 {
        return Vec::new();
    }

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|e| e - mean).collect();
    let denom: f64 = centered.iter().map(|c| c * c).sum();

    (0..=max_lag.min(n - 1))
        .map(|k| {
            if denom <= 0.0 {
                return if k == 0 { 1.0 } else { 0.0 };
            }
            let num: f64 = (k..n).map(|t| centered[t] * centered[t - k]).sum();
            num / denom
        })
        .collect()
}
