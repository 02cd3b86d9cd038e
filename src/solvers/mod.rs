//! Model wrappers fitted once per diagnostic session.

mod huber;
mod ols;
mod traits;

pub use huber::{HuberModel, HUBER_K};
pub use ols::{least_squares, LeastSquaresFit, OlsModel, DEFAULT_RANK_TOLERANCE};
pub use traits::{
    Influence, InfluenceCapable, ModelError, ModelSummary, ModelType, ModelWrapper,
};

use faer::{Col, Mat};

/// Build and fit the wrapper for `model_type` on copies of `x` and `y`.
pub fn fit_model(
    model_type: ModelType,
    x: &Mat<f64>,
    y: &Col<f64>,
) -> Result<Box<dyn ModelWrapper>, ModelError> {
    let mut model: Box<dyn ModelWrapper> = match model_type {
        ModelType::Linear => Box::new(OlsModel::new(x.clone(), y.clone())),
        ModelType::Robust => Box::new(HuberModel::new(x.clone(), y.clone())),
    };
    model.fit()?;
    Ok(model)
}
