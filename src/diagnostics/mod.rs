//! Statistical tests behind the assumption checks.
//!
//! This module is the numeric layer that the checks in [`crate::checks`]
//! consume:
//!
//! - **Leverage**: hat-matrix diagonal and `(X'X)^-1`
//! - **Residuals**: standardized and studentized residuals
//! - **Influence**: Cook's distance and DFBETAS
//! - **VIF**: Variance Inflation Factor and predictor correlation
//! - **Heteroscedasticity**: Breusch-Pagan
//! - **Autocorrelation**: Durbin-Watson and the sample ACF
//! - **Normality**: Shapiro-Wilk, D'Agostino-Pearson and Anderson-Darling
//!
//! # Example
//!
//! ```rust,ignore
//! use regcheck::diagnostics::{breusch_pagan, durbin_watson, variance_inflation_factor};
//!
//! let bp = breusch_pagan(&residuals, &x)?;
//! let dw = durbin_watson(&residuals);
//! let vif = variance_inflation_factor(&x);
//! ```

mod autocorrelation;
mod heteroscedasticity;
mod influence;
mod leverage;
mod normality;
mod residuals;
mod vif;

pub use autocorrelation::{autocorrelation, durbin_watson};
pub use heteroscedasticity::{breusch_pagan, BreuschPagan};
pub use influence::{cooks_distance, dfbetas, influential_cooks};
pub use leverage::{high_leverage_points, leverage_from_design, xtx_inverse};
pub use normality::{
    anderson_darling, dagostino_pearson, shapiro_wilk, AndersonDarling, DAgostinoPearson,
    ShapiroWilk, ANDERSON_SIGNIFICANCE,
};
pub use residuals::studentized_residuals;
pub use vif::{correlation_matrix, high_vif_predictors, variance_inflation_factor};
