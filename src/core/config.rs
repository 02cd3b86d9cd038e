//! Thresholds and run options for a diagnostic session.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::severity::SeverityThresholds;

/// What the dispatcher does when a check returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run and return the first error.
    #[default]
    Abort,
    /// Record the error as a failed, high-severity result and keep going.
    Isolate,
}

/// Acceptable range for the Durbin-Watson statistic, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurbinWatsonBand {
    pub lower: f64,
    pub upper: f64,
}

impl Default for DurbinWatsonBand {
    fn default() -> Self {
        Self {
            lower: 1.5,
            upper: 2.5,
        }
    }
}

impl DurbinWatsonBand {
    pub fn contains(&self, d: f64) -> bool {
        (self.lower..=self.upper).contains(&d)
    }
}

/// Cutoffs of the influence check.
///
/// The leverage cutoff is `leverage_multiplier · p / n` and the DFBETAS
/// cutoff `dfbeta_multiplier / √n`, with p the number of model parameters
/// including the intercept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceThresholds {
    pub cooks_distance: f64,
    pub leverage_multiplier: f64,
    pub dfbeta_multiplier: f64,
}

impl Default for InfluenceThresholds {
    fn default() -> Self {
        Self {
            cooks_distance: 0.1,
            leverage_multiplier: 2.0,
            dfbeta_multiplier: 2.0,
        }
    }
}

impl InfluenceThresholds {
    pub fn leverage_cutoff(&self, n_parameters: usize, n_observations: usize) -> f64 {
        self.leverage_multiplier * n_parameters as f64 / n_observations as f64
    }

    pub fn dfbeta_cutoff(&self, n_observations: usize) -> f64 {
        self.dfbeta_multiplier / (n_observations as f64).sqrt()
    }
}

/// Severity cut points per statistic.
///
/// `r_squared` and `p_value` are lower-is-worse: `high` is the smallest cut
/// point. The other tables are higher-is-worse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityTables {
    pub r_squared: SeverityThresholds,
    pub p_value: SeverityThresholds,
    pub vif: SeverityThresholds,
    pub cooks_distance: SeverityThresholds,
    /// Applied to |d - 2|.
    pub durbin_watson: SeverityThresholds,
}

impl Default for SeverityTables {
    fn default() -> Self {
        Self {
            r_squared: SeverityThresholds::new(0.5, 0.7, 0.9),
            p_value: SeverityThresholds::new(0.01, 0.05, 0.1),
            vif: SeverityThresholds::new(10.0, 5.0, 0.0),
            cooks_distance: SeverityThresholds::new(0.5, 0.2, 0.1),
            durbin_watson: SeverityThresholds::new(1.0, 0.5, 0.25),
        }
    }
}

/// Errors that can occur when loading or validating a [`DiagnosticsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1), got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{name} must be positive and finite, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Durbin-Watson band must satisfy 0 <= lower <= upper <= 4, got [{lower}, {upper}]")]
    InvalidBand { lower: f64, upper: f64 },
    #[error("severity table '{0}' is not ordered")]
    UnorderedSeverity(&'static str),
    #[error("{name} must be at least 1")]
    InvalidCount { name: &'static str },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pass/fail thresholds, severity tables and dispatch options.
///
/// Every field has a default, so a TOML file only needs the values it
/// overrides:
///
/// ```toml
/// r2_threshold = 0.8
/// failure_policy = "isolate"
///
/// [durbin_watson]
/// lower = 1.4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Linearity passes when R² is strictly greater than this (default: 0.7).
    pub r2_threshold: f64,
    /// Homoscedasticity passes when the Breusch-Pagan p-value exceeds this (default: 0.05).
    pub homoscedasticity_pval: f64,
    /// Significance level of each normality test (default: 0.05).
    pub normality_pval: f64,
    /// Multicollinearity passes when every VIF is below this (default: 5).
    pub vif_threshold: f64,
    pub durbin_watson: DurbinWatsonBand,
    pub influence: InfluenceThresholds,
    pub severity: SeverityTables,
    pub failure_policy: FailurePolicy,
    /// Run checks on the rayon pool (default: false).
    pub parallel: bool,
    /// Lags drawn in the ACF plot (default: 20).
    pub acf_lags: usize,
    /// Bins of the residual histogram (default: 20).
    pub histogram_bins: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            r2_threshold: 0.7,
            homoscedasticity_pval: 0.05,
            normality_pval: 0.05,
            vif_threshold: 5.0,
            durbin_watson: DurbinWatsonBand::default(),
            influence: InfluenceThresholds::default(),
            severity: SeverityTables::default(),
            failure_policy: FailurePolicy::Abort,
            parallel: false,
            acf_lags: 20,
            histogram_bins: 20,
        }
    }
}

impl DiagnosticsConfig {
    /// Create a new builder for the configuration.
    pub fn builder() -> DiagnosticsConfigBuilder {
        DiagnosticsConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: DiagnosticsConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("r2_threshold", self.r2_threshold),
            ("homoscedasticity_pval", self.homoscedasticity_pval),
            ("normality_pval", self.normality_pval),
        ];
        for (name, value) in probabilities {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }

        let positives = [
            ("vif_threshold", self.vif_threshold),
            ("influence.cooks_distance", self.influence.cooks_distance),
            ("influence.leverage_multiplier", self.influence.leverage_multiplier),
            ("influence.dfbeta_multiplier", self.influence.dfbeta_multiplier),
        ];
        for (name, value) in positives {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        let band = self.durbin_watson;
        if !(0.0 <= band.lower && band.lower <= band.upper && band.upper <= 4.0) {
            return Err(ConfigError::InvalidBand {
                lower: band.lower,
                upper: band.upper,
            });
        }

        let tables = &self.severity;
        let ordered = [
            ("r_squared", tables.r_squared.negated()),
            ("p_value", tables.p_value.negated()),
            ("vif", tables.vif),
            ("cooks_distance", tables.cooks_distance),
            ("durbin_watson", tables.durbin_watson),
        ];
        for (name, table) in ordered {
            if !table.is_ordered() {
                return Err(ConfigError::UnorderedSeverity(name));
            }
        }

        if self.acf_lags == 0 {
            return Err(ConfigError::InvalidCount { name: "acf_lags" });
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::InvalidCount {
                name: "histogram_bins",
            });
        }
        Ok(())
    }
}

/// Builder for [`DiagnosticsConfig`].
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsConfigBuilder {
    config: DiagnosticsConfig,
}

impl DiagnosticsConfigBuilder {
    /// Create a new builder with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn r2_threshold(mut self, threshold: f64) -> Self {
        self.config.r2_threshold = threshold;
        self
    }

    pub fn homoscedasticity_pval(mut self, alpha: f64) -> Self {
        self.config.homoscedasticity_pval = alpha;
        self
    }

    pub fn normality_pval(mut self, alpha: f64) -> Self {
        self.config.normality_pval = alpha;
        self
    }

    pub fn vif_threshold(mut self, threshold: f64) -> Self {
        self.config.vif_threshold = threshold;
        self
    }

    /// Set the inclusive Durbin-Watson acceptance band.
    pub fn durbin_watson_band(mut self, lower: f64, upper: f64) -> Self {
        self.config.durbin_watson = DurbinWatsonBand { lower, upper };
        self
    }

    pub fn cooks_distance_threshold(mut self, threshold: f64) -> Self {
        self.config.influence.cooks_distance = threshold;
        self
    }

    pub fn influence(mut self, thresholds: InfluenceThresholds) -> Self {
        self.config.influence = thresholds;
        self
    }

    pub fn severity_tables(mut self, tables: SeverityTables) -> Self {
        self.config.severity = tables;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Run checks in parallel on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn acf_lags(mut self, lags: usize) -> Self {
        self.config.acf_lags = lags;
        self
    }

    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.config.histogram_bins = bins;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<DiagnosticsConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation.
    pub fn build_unchecked(self) -> DiagnosticsConfig {
        self.config
    }
}
