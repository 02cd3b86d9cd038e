//! Everything a check needs to run: the data, the model, the configuration
//! and the plot renderer.

use std::collections::HashSet;

use faer::{Col, Mat};
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::core::{DiagnosticsConfig, PlotImage};
use crate::error::Result;
use crate::plot::{PlotRenderer, PlotSpec};
use crate::solvers::{fit_model, ModelType, ModelWrapper};

/// Inputs of one check invocation.
///
/// The dispatcher hands every check the same fitted wrapper. A context built
/// without one fits an OLS model the first time a check asks for it, so a
/// standalone check still costs a single fit.
pub struct CheckContext<'a> {
    x: &'a Mat<f64>,
    y: &'a Col<f64>,
    config: &'a DiagnosticsConfig,
    renderer: &'a dyn PlotRenderer,
    feature_names: Option<&'a [String]>,
    return_plot: bool,
    shared: Option<&'a dyn ModelWrapper>,
    local: OnceCell<Box<dyn ModelWrapper>>,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        x: &'a Mat<f64>,
        y: &'a Col<f64>,
        config: &'a DiagnosticsConfig,
        renderer: &'a dyn PlotRenderer,
    ) -> Self {
        Self {
            x,
            y,
            config,
            renderer,
            feature_names: None,
            return_plot: false,
            shared: None,
            local: OnceCell::new(),
        }
    }

    /// Use an already fitted wrapper instead of fitting one on demand.
    pub fn with_model(mut self, model: &'a dyn ModelWrapper) -> Self {
        self.shared = Some(model);
        self
    }

    pub fn with_feature_names(mut self, names: &'a [String]) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn return_plot(mut self, return_plot: bool) -> Self {
        self.return_plot = return_plot;
        self
    }

    pub fn x(&self) -> &Mat<f64> {
        self.x
    }

    pub fn y(&self) -> &Col<f64> {
        self.y
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        self.config
    }

    pub fn n_observations(&self) -> usize {
        self.y.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Whether the caller asked for figures.
    pub fn wants_plots(&self) -> bool {
        self.return_plot
    }

    /// Name of predictor `j`; `x{j}` when no names were supplied.
    pub fn feature_name(&self, j: usize) -> String {
        self.feature_names
            .and_then(|names| names.get(j))
            .cloned()
            .unwrap_or_else(|| format!("x{j}"))
    }

    /// Names of every predictor, made unique: a repeated name gets its
    /// column index appended, e.g. `age[2]`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        (0..self.n_features())
            .map(|j| {
                let base = self.feature_name(j);
                let mut name = base.clone();
                if seen.contains(&name) {
                    name = format!("{base}[{j}]");
                }
                while !seen.insert(name.clone()) {
                    name.push('\'');
                }
                name
            })
            .collect()
    }

    /// Family of the model the checks read from.
    pub fn model_type(&self) -> ModelType {
        self.shared
            .map_or(ModelType::Linear, |model| model.model_type())
    }

    /// The fitted wrapper, fitting a linear model on first use if none was
    /// supplied.
    pub fn model(&self) -> Result<&dyn ModelWrapper> {
        if let Some(model) = self.shared {
            return Ok(model);
        }

        let model = self.local.get_or_try_init(|| {
            debug!(
                n_observations = self.n_observations(),
                n_features = self.n_features(),
                "fitting standalone linear model for check"
            );
            fit_model(ModelType::Linear, self.x, self.y)
        })?;
        Ok(model.as_ref())
    }

    /// Render `spec` into a titled image.
    pub fn render(&self, spec: &PlotSpec) -> Result<PlotImage> {
        Ok(spec.to_image(self.renderer)?)
    }

    /// Render `spec` into a bare encoded image.
    pub fn render_base64(&self, spec: &PlotSpec) -> Result<String> {
        Ok(self.renderer.render(spec)?)
    }
}
