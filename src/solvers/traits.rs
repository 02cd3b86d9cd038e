//! Core traits shared by every fitted model family.

use std::fmt;
use std::str::FromStr;

use faer::{Col, Mat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while fitting or querying a model wrapper.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("model has not been fitted; call fit() first")]
    NotFitted,

    #[error("shape mismatch: model was fitted on {expected} predictor(s) but got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    #[error("input contains NaN or infinite values")]
    NonFiniteInput,

    #[error("matrix is singular or nearly singular")]
    SingularMatrix,
}

/// Model family tag used by the registry to decide which checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Ordinary least squares with an intercept.
    #[default]
    Linear,
    /// Huber M-estimation by iteratively reweighted least squares.
    Robust,
}

impl ModelType {
    /// Every model family known to the crate.
    pub const ALL: [ModelType; 2] = [ModelType::Linear, ModelType::Robust];

    /// The tag string used in configuration and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Linear => "linear",
            ModelType::Robust => "robust",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = crate::error::DiagnosticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "ols" => Ok(ModelType::Linear),
            "robust" | "huber" => Ok(ModelType::Robust),
            other => Err(crate::error::DiagnosticError::UnknownModelType(
                other.to_string(),
            )),
        }
    }
}

/// Model metadata and fit quality, as shown at the top of a report.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model_type: ModelType,
    /// Human-readable family name.
    pub label: &'static str,
    /// Coefficient of determination in [0, 1].
    pub r_squared: f64,
    pub n_observations: usize,
    /// Number of estimated parameters, intercept included.
    pub n_parameters: usize,
    pub intercept: f64,
    /// Slope estimates; aliased (collinear) predictors are `NaN`.
    pub coefficients: Vec<f64>,
}

/// Per-observation influence statistics of a fitted model.
#[derive(Debug, Clone)]
pub struct Influence {
    /// Diagonal of the hat matrix.
    pub leverage: Col<f64>,
    pub cooks_distance: Col<f64>,
    /// Internally studentized residuals.
    pub studentized_residuals: Col<f64>,
    /// Standardized DFBETAS, one row per observation and one column per
    /// parameter (intercept first).
    pub dfbetas: Mat<f64>,
    pub n_parameters: usize,
}

/// A regression model fitted once per diagnostic session.
///
/// Accessors must not be called before [`ModelWrapper::fit`]; they return
/// [`ModelError::NotFitted`] if they are. Once fitted, every accessor takes
/// `&self` and has no side effects, so a fitted wrapper can be read from
/// several checks at once.
pub trait ModelWrapper: Send + Sync + fmt::Debug {
    /// Family tag of this wrapper.
    fn model_type(&self) -> ModelType;

    /// Estimate the model. Calling `fit` on a fitted wrapper is a no-op.
    fn fit(&mut self) -> Result<(), ModelError>;

    /// Whether [`fit`](ModelWrapper::fit) has completed.
    fn is_fitted(&self) -> bool;

    /// Number of observations the wrapper was built with.
    fn n_observations(&self) -> usize;

    /// Number of predictor columns (intercept excluded).
    fn n_features(&self) -> usize;

    /// Predict the response for new predictor rows.
    ///
    /// `x` must have the same column count as the training predictors.
    fn predict(&self, x: &Mat<f64>) -> Result<Col<f64>, ModelError>;

    /// `y - fitted()`, elementwise.
    fn residuals(&self) -> Result<&Col<f64>, ModelError>;

    /// Fitted values on the training rows.
    fn fitted(&self) -> Result<&Col<f64>, ModelError>;

    /// Model-type label and fit quality.
    fn summary(&self) -> Result<ModelSummary, ModelError>;

    /// Influence capability, for families that support leverage analysis.
    fn as_influence(&self) -> Option<&dyn InfluenceCapable> {
        None
    }
}

/// Optional capability: leverage, Cook's distance and DFBETAS.
pub trait InfluenceCapable {
    /// Influence statistics of the fitted model.
    fn influence(&self) -> Result<&Influence, ModelError>;
}

/// Validate the (X, y) pair handed to a model wrapper.
pub(crate) fn validate_inputs(
    x: &Mat<f64>,
    y: &Col<f64>,
    n_params: usize,
) -> Result<(), ModelError> {
    if x.nrows() != y.nrows() {
        return Err(ModelError::DimensionMismatch {
            x_rows: x.nrows(),
            y_len: y.nrows(),
        });
    }

    let needed = n_params.max(2);
    if x.nrows() < needed {
        return Err(ModelError::InsufficientObservations {
            needed,
            got: x.nrows(),
        });
    }

    if !crate::utils::all_finite(x, y) {
        return Err(ModelError::NonFiniteInput);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_round_trip() {
        for model_type in ModelType::ALL {
            let parsed: ModelType = model_type.as_str().parse().expect("known tag");
            assert_eq!(parsed, model_type);
        }
        assert_eq!("OLS".parse::<ModelType>().ok(), Some(ModelType::Linear));
        assert!("forest".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_validate_inputs() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = Col::from_fn(4, |i| i as f64);
        assert_eq!(
            validate_inputs(&x, &y, 2),
            Err(ModelError::DimensionMismatch { x_rows: 5, y_len: 4 })
        );

        let y = Col::from_fn(5, |i| if i == 2 { f64::NAN } else { i as f64 });
        assert_eq!(validate_inputs(&x, &y, 2), Err(ModelError::NonFiniteInput));

        let y = Col::from_fn(5, |i| i as f64);
        assert_eq!(
            validate_inputs(&x, &y, 6),
            Err(ModelError::InsufficientObservations { needed: 6, got: 5 })
        );
    }
}
