//! Diagnostic figures.
//!
//! Checks describe what to draw with a [`PlotSpec`]; a [`PlotRenderer`]
//! turns it into an encoded image. The default [`SvgRenderer`] writes SVG and
//! base64-encodes it, so results stay plain strings that any report can
//! embed.

mod svg;

pub use svg::SvgRenderer;

use std::fmt;

use thiserror::Error;

use crate::core::PlotImage;

/// Errors that can occur while rendering a figure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlotError {
    #[error("nothing to draw for the {0} plot")]
    Empty(PlotKind),
    #[error("{kind} plot series have different lengths ({x} vs {y})")]
    LengthMismatch { kind: PlotKind, x: usize, y: usize },
    #[error("renderer failed: {0}")]
    Render(String),
}

/// Which diagnostic figure a [`PlotSpec`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    ResidualsVsFitted,
    QQ,
    Histogram,
    CorrelationHeatmap,
    Acf,
    CooksDistance,
    LeverageVsResiduals,
}

impl PlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotKind::ResidualsVsFitted => "residuals_vs_fitted",
            PlotKind::QQ => "qq",
            PlotKind::Histogram => "histogram",
            PlotKind::CorrelationHeatmap => "correlation_heatmap",
            PlotKind::Acf => "acf",
            PlotKind::CooksDistance => "cooks_distance",
            PlotKind::LeverageVsResiduals => "leverage_vs_residuals",
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Straight line `y = intercept + slope · x` drawn over a scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceLine {
    pub intercept: f64,
    pub slope: f64,
}

impl ReferenceLine {
    /// Horizontal line at `y`.
    pub fn horizontal(y: f64) -> Self {
        Self {
            intercept: y,
            slope: 0.0,
        }
    }
}

/// Data of a figure.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotData {
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        reference: Option<ReferenceLine>,
    },
    /// Vertical bars (or stems) of `heights` centred on `x`.
    Bars {
        x: Vec<f64>,
        heights: Vec<f64>,
        /// Dashed horizontal cutoffs, e.g. ACF confidence bands.
        guides: Vec<f64>,
    },
    /// Square matrix of values in [-1, 1] with row/column labels.
    Matrix {
        labels: Vec<String>,
        values: Vec<Vec<f64>>,
    },
}

/// Everything a renderer needs to draw one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub kind: PlotKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: PlotData,
}

impl PlotSpec {
    pub fn new(kind: PlotKind, title: impl Into<String>, data: PlotData) -> Self {
        Self {
            kind,
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            data,
        }
    }

    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    /// Reject empty or ragged data before it reaches a renderer.
    pub fn validate(&self) -> Result<(), PlotError> {
        let (x_len, y_len) = match &self.data {
            PlotData::Scatter { x, y, .. } => (x.len(), y.len()),
            PlotData::Bars { x, heights, .. } => (x.len(), heights.len()),
            PlotData::Matrix { labels, values } => {
                if values.iter().any(|row| row.len() != labels.len()) {
                    return Err(PlotError::LengthMismatch {
                        kind: self.kind,
                        x: labels.len(),
                        y: values.first().map_or(0, Vec::len),
                    });
                }
                (labels.len(), values.len())
            }
        };

        if x_len != y_len {
            return Err(PlotError::LengthMismatch {
                kind: self.kind,
                x: x_len,
                y: y_len,
            });
        }
        if x_len == 0 {
            return Err(PlotError::Empty(self.kind));
        }
        Ok(())
    }

    /// Render through `renderer` into a titled [`PlotImage`].
    pub fn to_image(&self, renderer: &dyn PlotRenderer) -> Result<PlotImage, PlotError> {
        Ok(PlotImage {
            title: self.title.clone(),
            kind: self.kind.as_str().to_string(),
            image: renderer.render(self)?,
        })
    }
}

/// Turns a [`PlotSpec`] into an opaque encoded image string.
pub trait PlotRenderer: Send + Sync + fmt::Debug {
    fn render(&self, spec: &PlotSpec) -> Result<String, PlotError>;
}
