//! Ordinary Least Squares model wrapper.

use faer::{Col, Mat};
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::diagnostics::{
    cooks_distance, dfbetas, leverage_from_design, studentized_residuals, xtx_inverse,
};
use crate::solvers::traits::{
    validate_inputs, Influence, InfluenceCapable, ModelError, ModelSummary, ModelType,
    ModelWrapper,
};
use crate::utils::{
    center_columns, design_with_intercept, detect_constant_columns, r_squared, select_columns,
};

/// Default tolerance on the diagonal of R when determining numerical rank.
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-10;

/// Result of a least squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Slope estimates; aliased columns are `NaN`.
    pub coefficients: Col<f64>,
    /// Intercept, or 0 when fitted without one.
    pub intercept: f64,
    /// Which columns were dropped as constant or linearly dependent.
    pub aliased: Vec<bool>,
    /// Numerical rank of the (centred) predictor matrix.
    pub rank: usize,
    pub fitted: Col<f64>,
    pub residuals: Col<f64>,
}

impl LeastSquaresFit {
    /// Number of estimated parameters, counting the intercept when present.
    pub fn n_parameters(&self, with_intercept: bool) -> usize {
        self.rank + usize::from(with_intercept)
    }

    /// Residual sum of squares.
    pub fn rss(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }

    /// Indices of the columns that were estimated.
    pub fn estimated_columns(&self) -> Vec<usize> {
        self.aliased
            .iter()
            .enumerate()
            .filter(|(_, &a)| !a)
            .map(|(j, _)| j)
            .collect()
    }
}

/// Solve `min ||y - b0 - X b||²` by QR decomposition.
///
/// With an intercept the problem is solved on centred data. Constant and
/// collinear columns are marked aliased and get a `NaN` coefficient.
pub fn least_squares(
    x: &Mat<f64>,
    y: &Col<f64>,
    with_intercept: bool,
    rank_tolerance: f64,
) -> Result<LeastSquaresFit, ModelError> {
    let n_samples = x.nrows();
    let n_features = x.ncols();

    if n_samples != y.nrows() {
        return Err(ModelError::DimensionMismatch {
            x_rows: n_samples,
            y_len: y.nrows(),
        });
    }
    if n_samples == 0 {
        return Err(ModelError::InsufficientObservations { needed: 1, got: 0 });
    }

    let constant_cols = detect_constant_columns(x, rank_tolerance);

    let (coefficients, aliased, rank, intercept) = if with_intercept {
        let (x_centered, x_means) = center_columns(x);
        let y_mean = y.iter().sum::<f64>() / n_samples as f64;
        let y_centered = Col::from_fn(n_samples, |i| y[i] - y_mean);

        let (coefficients, aliased, rank) =
            solve_with_qr(&x_centered, &y_centered, &constant_cols, rank_tolerance);

        let mut intercept = y_mean;
        for j in 0..n_features {
            if !aliased[j] {
                intercept -= x_means[j] * coefficients[j];
            }
        }
        (coefficients, aliased, rank, intercept)
    } else {
        let (coefficients, aliased, rank) = solve_with_qr(x, y, &[], rank_tolerance);
        (coefficients, aliased, rank, 0.0)
    };

    let fitted = Col::from_fn(n_samples, |i| {
        let mut pred = intercept;
        for j in 0..n_features {
            if !aliased[j] {
                pred += x[(i, j)] * coefficients[j];
            }
        }
        pred
    });
    let residuals = Col::from_fn(n_samples, |i| y[i] - fitted[i]);

    Ok(LeastSquaresFit {
        coefficients,
        intercept,
        aliased,
        rank,
        fitted,
        residuals,
    })
}

/// Solve the least squares problem by QR decomposition with column pivoting.
///
/// Rank is read off the diagonal of R; columns pivoted past the rank are
/// aliased and get a `NaN` coefficient.
fn solve_with_qr(
    x: &Mat<f64>,
    y: &Col<f64>,
    constant_cols: &[bool],
    rank_tolerance: f64,
) -> (Col<f64>, Vec<bool>, usize) {
    let n_features = x.ncols();
    let n_samples = x.nrows();

    let qr = x.col_piv_qr();
    let q = qr.compute_Q();
    let r = qr.R();
    // forward[k] is the original column sitting at pivot position k
    let forward = qr.P().arrays().0;

    let mut rank = 0;
    for k in 0..n_features.min(n_samples) {
        if r[(k, k)].abs() > rank_tolerance {
            rank += 1;
        } else {
            break;
        }
    }

    let mut aliased = vec![true; n_features];
    let mut coefficients = Col::from_fn(n_features, |_| f64::NAN);
    if rank == 0 {
        return (coefficients, aliased, 0);
    }

    let qty = q.transpose() * y;

    let mut beta_reduced = Col::zeros(rank);
    for i in (0..rank).rev() {
        let mut sum = qty[i];
        for j in (i + 1)..rank {
            sum -= r[(i, j)] * beta_reduced[j];
        }
        beta_reduced[i] = sum / r[(i, i)];
    }

    for (k, &j) in forward.iter().take(rank).enumerate() {
        if constant_cols.get(j).copied().unwrap_or(false) {
            continue;
        }
        aliased[j] = false;
        coefficients[j] = beta_reduced[k];
    }

    (coefficients, aliased, rank)
}

/// Fitted state of an [`OlsModel`].
#[derive(Debug, Clone)]
struct OlsState {
    fit: LeastSquaresFit,
    r_squared: f64,
    mse: f64,
    n_parameters: usize,
}

/// Ordinary least squares wrapper with an automatically injected intercept.
///
/// # Example
///
/// ```rust,ignore
/// use regcheck::solvers::{ModelWrapper, OlsModel};
/// use faer::{Col, Mat};
///
/// let x = Mat::from_fn(50, 1, |i, _| i as f64);
/// let y = Col::from_fn(50, |i| 1.0 + 2.0 * i as f64);
///
/// let mut model = OlsModel::new(x, y);
/// model.fit()?;
/// println!("R² = {}", model.summary()?.r_squared);
/// ```
#[derive(Debug)]
pub struct OlsModel {
    x: Mat<f64>,
    y: Col<f64>,
    state: Option<OlsState>,
    influence: OnceCell<Influence>,
}

impl OlsModel {
    /// Create an unfitted OLS wrapper owning its data.
    pub fn new(x: Mat<f64>, y: Col<f64>) -> Self {
        Self {
            x,
            y,
            state: None,
            influence: OnceCell::new(),
        }
    }

    /// Which predictors were aliased in the fit.
    pub fn aliased(&self) -> Result<&[bool], ModelError> {
        Ok(&self.state()?.fit.aliased)
    }

    /// Residual mean square, `RSS / (n - p)`.
    pub fn mse(&self) -> Result<f64, ModelError> {
        Ok(self.state()?.mse)
    }

    fn state(&self) -> Result<&OlsState, ModelError> {
        self.state.as_ref().ok_or(ModelError::NotFitted)
    }

    fn compute_influence(&self) -> Result<Influence, ModelError> {
        let state = self.state()?;
        let kept = state.fit.estimated_columns();
        let design = design_with_intercept(&select_columns(&self.x, &kept));
        let xtx_inv = xtx_inverse(&design)?;

        let leverage = leverage_from_design(&design, &xtx_inv);
        let residuals = &state.fit.residuals;

        Ok(Influence {
            cooks_distance: cooks_distance(residuals, &leverage, state.mse, state.n_parameters),
            studentized_residuals: studentized_residuals(residuals, &leverage, state.mse),
            dfbetas: dfbetas(
                &design,
                &xtx_inv,
                residuals,
                &leverage,
                state.mse,
                state.n_parameters,
            ),
            leverage,
            n_parameters: state.n_parameters,
        })
    }
}

impl ModelWrapper for OlsModel {
    fn model_type(&self) -> ModelType {
        ModelType::Linear
    }

    fn fit(&mut self) -> Result<(), ModelError> {
        if self.state.is_some() {
            return Ok(());
        }

        validate_inputs(&self.x, &self.y, self.x.ncols() + 1)?;

        let fit = least_squares(&self.x, &self.y, true, DEFAULT_RANK_TOLERANCE)?;
        let n = self.y.nrows();
        let n_parameters = fit.n_parameters(true);
        let df_resid = n.saturating_sub(n_parameters);
        let mse = if df_resid > 0 {
            fit.rss() / df_resid as f64
        } else {
            f64::NAN
        };
        let r_squared = r_squared(&self.y, &fit.fitted);

        debug!(
            n_observations = n,
            n_parameters,
            rank = fit.rank,
            r_squared,
            "fitted OLS model"
        );

        self.state = Some(OlsState {
            fit,
            r_squared,
            mse,
            n_parameters,
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

        let fit = &state.fit;
        Ok(Col::from_fn(x.nrows(), |i| {
            let mut pred = fit.intercept;
            for j in 0..x.ncols() {
                if !fit.aliased[j] {
                    pred += x[(i, j)] * fit.coefficients[j];
                }
            }
            pred
        }))
    }

    fn residuals(&self) -> Result<&Col<f64>, ModelError> {
        Ok(&self.state()?.fit.residuals)
    }

    fn fitted(&self) -> Result<&Col<f64>, ModelError> {
        Ok(&self.state()?.fit.fitted)
    }

    fn summary(&self) -> Result<ModelSummary, ModelError> {
        let state = self.state()?;
        Ok(ModelSummary {
            model_type: ModelType::Linear,
            label: "Linear Regression",
            r_squared: state.r_squared,
            n_observations: self.y.nrows(),
            n_parameters: state.n_parameters,
            intercept: state.fit.intercept,
            coefficients: state.fit.coefficients.iter().copied().collect(),
        })
    }

    fn as_influence(&self) -> Option<&dyn InfluenceCapable> {
        Some(self)
    }
}

impl InfluenceCapable for OlsModel {
    fn influence(&self) -> Result<&Influence, ModelError> {
        self.influence.get_or_try_init(|| self.compute_influence())
    }
}
