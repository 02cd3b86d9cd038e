//! Huber M-estimation by iteratively reweighted least squares.

use faer::{Col, Mat};
use tracing::{debug, warn};

use crate::solvers::ols::{least_squares, LeastSquaresFit, DEFAULT_RANK_TOLERANCE};
use crate::solvers::traits::{
    validate_inputs, ModelError, ModelSummary, ModelType, ModelWrapper,
};
use crate::utils::{design_with_intercept, r_squared};

/// Tuning constant giving 95% efficiency at the normal model.
pub const HUBER_K: f64 = 1.345;

/// Consistency constant turning the MAD into a normal-scale estimate.
const MAD_NORMAL_CONSTANT: f64 = 0.6745;

#[derive(Debug, Clone)]
struct HuberState {
    intercept: f64,
    coefficients: Col<f64>,
    aliased: Vec<bool>,
    fitted: Col<f64>,
    residuals: Col<f64>,
    scale: f64,
    r_squared: f64,
    n_parameters: usize,
    iterations: usize,
    converged: bool,
}

/// Robust linear regression with Huber's T norm.
///
/// Each iteration rescales the design (intercept column included) by the
/// square root of the Huber weights and solves an ordinary least squares
/// problem, as a weighted least squares fit would. The residual scale is
/// re-estimated every iteration as MAD / 0.6745.
///
/// Influence statistics are not defined for this family, so
/// [`ModelWrapper::as_influence`] returns `None`.
#[derive(Debug)]
pub struct HuberModel {
    x: Mat<f64>,
    y: Col<f64>,
    k: f64,
    max_iterations: usize,
    tolerance: f64,
    state: Option<HuberState>,
}

impl HuberModel {
    /// Create an unfitted Huber wrapper owning its data.
    pub fn new(x: Mat<f64>, y: Col<f64>) -> Self {
        Self {
            x,
            y,
            k: HUBER_K,
            max_iterations: 50,
            tolerance: 1e-8,
            state: None,
        }
    }

    /// Set the Huber tuning constant.
    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    /// Set the maximum number of IRLS iterations.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set the convergence tolerance on the coefficient change.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Robust residual scale of the final iteration.
    pub fn scale(&self) -> Result<f64, ModelError> {
        Ok(self.state()?.scale)
    }

    /// Number of IRLS iterations run and whether they converged.
    pub fn iterations(&self) -> Result<(usize, bool), ModelError> {
        let state = self.state()?;
        Ok((state.iterations, state.converged))
    }

    fn state(&self) -> Result<&HuberState, ModelError> {
        self.state.as_ref().ok_or(ModelError::NotFitted)
    }

    fn weighted_fit(&self, design: &Mat<f64>, weights: &[f64]) -> Result<LeastSquaresFit, ModelError> {
        let sqrt_w: Vec<f64> = weights.iter().map(|w| w.sqrt()).collect();
        let xw = Mat::from_fn(design.nrows(), design.ncols(), |i, j| {
            design[(i, j)] * sqrt_w[i]
        });
        let yw = Col::from_fn(self.y.nrows(), |i| self.y[i] * sqrt_w[i]);
        least_squares(&xw, &yw, false, DEFAULT_RANK_TOLERANCE)
    }

    fn huber_weights(&self, residuals: &Col<f64>, scale: f64) -> Vec<f64> {
        residuals
            .iter()
            .map(|r| {
                let u = (r / scale).abs();
                if u <= self.k {
                    1.0
                } else {
                    self.k / u
                }
            })
            .collect()
    }
}

/// Median absolute deviation about the median, scaled to be consistent for
/// the normal standard deviation.
fn mad_scale(residuals: &Col<f64>) -> f64 {
    let median = |mut v: Vec<f64>| {
        v.sort_by(|a, b| a.total_cmp(b));
        let n = v.len();
        if n == 0 {
            f64::NAN
        } else if n % 2 == 1 {
            v[n / 2]
        } else {
            0.5 * (v[n / 2 - 1] + v[n / 2])
        }
    };

    let center = median(residuals.iter().copied().collect());
    median(residuals.iter().map(|r| (r - center).abs()).collect()) / MAD_NORMAL_CONSTANT
}

/// Evaluate `design · beta`, skipping aliased columns.
fn linear_predictor(design: &Mat<f64>, fit: &LeastSquaresFit) -> Col<f64> {
    Col::from_fn(design.nrows(), |i| {
        (0..design.ncols())
            .filter(|&j| !fit.aliased[j])
            .map(|j| design[(i, j)] * fit.coefficients[j])
            .sum()
    })
}

impl ModelWrapper for HuberModel {
    fn model_type(&self) -> ModelType {
        ModelType::Robust
    }

    fn fit(&mut self) -> Result<(), ModelError> {
        if self.state.is_some() {
            return Ok(());
        }

        validate_inputs(&self.x, &self.y, self.x.ncols() + 1)?;

        let n = self.y.nrows();
        let design = design_with_intercept(&self.x);

        let mut fit = self.weighted_fit(&design, &vec![1.0; n])?;
        let mut fitted = linear_predictor(&design, &fit);
        let mut residuals = Col::from_fn(n, |i| self.y[i] - fitted[i]);
        let mut scale = mad_scale(&residuals);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.max_iterations {
            iterations = iter + 1;

            // exact fit on at least half the data: every weight stays 1
            if scale.is_nan() || scale <= 0.0 {
                converged = true;
                break;
            }

            let weights = self.huber_weights(&residuals, scale);
            let fit_new = self.weighted_fit(&design, &weights)?;

            let max_change = fit_new
                .coefficients
                .iter()
                .zip(fit.coefficients.iter())
                .filter(|(a, b)| a.is_finite() && b.is_finite())
                .map(|(a, b)| (a - b).abs() / (1.0 + b.abs()))
                .fold(0.0_f64, f64::max);

            fit = fit_new;
            fitted = linear_predictor(&design, &fit);
            residuals = Col::from_fn(n, |i| self.y[i] - fitted[i]);
            scale = mad_scale(&residuals);

            if max_change < self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                tolerance = self.tolerance,
                "Huber IRLS did not converge; keeping the last iterate"
            );
        }

        let intercept = if fit.aliased[0] { 0.0 } else { fit.coefficients[0] };
        let coefficients = Col::from_fn(self.x.ncols(), |j| fit.coefficients[j + 1]);
        let aliased = fit.aliased[1..].to_vec();
        let r_squared = r_squared(&self.y, &fitted);
        let n_parameters = fit.rank;

        debug!(
            n_observations = n,
            n_parameters,
            iterations,
            converged,
            scale,
            r_squared,
            "fitted Huber model"
        );

        self.state = Some(HuberState {
            intercept,
            coefficients,
            aliased,
            fitted,
            residuals,
            scale,
            r_squared,
            n_parameters,
            iterations,
            converged,
        });
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn n_observations(&self) -> usize {
        self.y.nrows()
    }

    fn n_features(&self) -> usize {
        self.x.ncols()
    }

    fn predict(&self, x: &Mat<f64>) -> Result<Col<f64>, ModelError> {
        let state = self.state()?;
        if x.ncols() != self.x.ncols() {
            return Err(ModelError::ShapeMismatch {
                expected: self.x.ncols(),
                got: x.ncols(),
            });
        }

        Ok(Col::from_fn(x.nrows(), |i| {
            let mut pred = state.intercept;
            for j in 0..x.ncols() {
                if !state.aliased[j] {
                    pred += x[(i, j)] * state.coefficients[j];
                }
            }
            pred
        }))
    }

    fn residuals(&self) -> Result<&Col<f64>, ModelError> {
        Ok(&self.state()?.residuals)
    }

    fn fitted(&self) -> Result<&Col<f64>, ModelError> {
        Ok(&self.state()?.fitted)
    }

    fn summary(&self) -> Result<ModelSummary, ModelError> {
        let state = self.state()?;
        Ok(ModelSummary {
            model_type: ModelType::Robust,
            label: "Robust Regression (Huber)",
            r_squared: state.r_squared,
            n_observations: self.y.nrows(),
            n_parameters: state.n_parameters,
            intercept: state.intercept,
            coefficients: state.coefficients.iter().copied().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line_is_recovered() {
        let x = Mat::from_fn(20, 1, |i, _| i as f64);
        let y = Col::from_fn(20, |i| 4.0 - 0.5 * i as f64);
        let mut model = HuberModel::new(x, y);
        model.fit().expect("fit");

        let summary = model.summary().expect("summary");
        assert!((summary.intercept - 4.0).abs() < 1e-8);
        assert!((summary.coefficients[0] + 0.5).abs() < 1e-8);
        assert!(model.as_influence().is_none());
    }

    #[test]
    fn test_outlier_is_downweighted() {
        let n = 40;
        let x = Mat::from_fn(n, 1, |i, _| i as f64);
        let y = Col::from_fn(n, |i| {
            let noise = 0.3 * (i as f64 * 2.1).sin();
            if i == 35 {
                1.0 + 2.0 * i as f64 + 200.0
            } else {
                1.0 + 2.0 * i as f64 + noise
            }
        });

        let mut ols = crate::solvers::OlsModel::new(x.clone(), y.clone());
        ols.fit().expect("ols fit");
        let mut huber = HuberModel::new(x, y);
        huber.fit().expect("huber fit");

        let ols_slope = ols.summary().expect("summary").coefficients[0];
        let huber_slope = huber.summary().expect("summary").coefficients[0];
        assert!((huber_slope - 2.0).abs() < (ols_slope - 2.0).abs());
        assert!((huber_slope - 2.0).abs() < 0.05, "slope = {huber_slope}");
    }

    #[test]
    fn test_residual_identity() {
        let x = Mat::from_fn(30, 2, |i, j| ((i + 1) * (j + 2)) as f64 % 7.0 + i as f64 * 0.1);
        let y = Col::from_fn(30, |i| (i as f64 * 0.37).cos() * 3.0 + i as f64);
        let mut model = HuberModel::new(x, y.clone());
        model.fit().expect("fit");

        let residuals = model.residuals().expect("residuals");
        let fitted = model.fitted().expect("fitted");
        for i in 0..30 {
            assert!((residuals[i] + fitted[i] - y[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_mad_scale() {
        let r = Col::from_fn(5, |i| [1.0, 2.0, 3.0, 4.0, 100.0][i]);
        // median 3, absolute deviations [2, 1, 0, 1, 97] -> median 1
        assert!((mad_scale(&r) - 1.0 / MAD_NORMAL_CONSTANT).abs() < 1e-12);
    }

    #[test]
    fn test_not_fitted() {
        let model = HuberModel::new(Mat::from_fn(4, 1, |i, _| i as f64), Col::zeros(4));
        assert_eq!(model.iterations().err(), Some(ModelError::NotFitted));
    }
}
