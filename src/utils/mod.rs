//! Shared numeric helpers.

mod matrix;

pub use matrix::{
    all_finite, center_columns, column, design_with_intercept, detect_constant_columns,
    drop_column, mean, r_squared, sample_variance, select_columns,
};
