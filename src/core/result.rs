//! The uniform record every assumption check returns.

use faer::Col;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::core::severity::Severity;

/// A single metric in [`AssumptionResult::details`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DetailValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl DetailValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DetailValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DetailValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            DetailValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for DetailValue {
    fn from(v: f64) -> Self {
        DetailValue::Number(v)
    }
}

impl From<usize> for DetailValue {
    fn from(v: usize) -> Self {
        DetailValue::Number(v as f64)
    }
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        DetailValue::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        DetailValue::Text(s)
    }
}

impl From<Vec<String>> for DetailValue {
    fn from(items: Vec<String>) -> Self {
        DetailValue::List(items)
    }
}

/// Insertion-ordered metric map. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    entries: Vec<(String, DetailValue)>,
}

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Shorthand for `get(key).and_then(DetailValue::as_number)`.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(DetailValue::as_number)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DetailValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Display hint for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    #[default]
    Info,
    Warning,
    Critical,
}

/// One encoded diagnostic figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotImage {
    pub title: String,
    /// Figure type, e.g. `"qq"` or `"acf"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Base64-encoded image.
    pub image: String,
}

/// Outcome of one assumption check.
///
/// Built with [`AssumptionResult::builder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssumptionResult {
    name: String,
    passed: bool,
    summary: String,
    details: Details,
    #[serde(skip_serializing_if = "Option::is_none")]
    residuals: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fitted: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot_base64: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    plots: Vec<PlotImage>,
    severity: Option<Severity>,
    recommendation: Option<String>,
    flag: Flag,
}

impl AssumptionResult {
    pub fn builder(name: impl Into<String>) -> AssumptionResultBuilder {
        AssumptionResultBuilder::new(name)
    }

    /// Passing, low-severity record for a check that does not apply to the
    /// input. `note` explains why.
    pub fn not_applicable(
        name: impl Into<String>,
        summary: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self::builder(name)
            .passed(true)
            .summary(summary)
            .detail("status", "not applicable")
            .detail("note", note.into())
            .severity(Severity::Low)
            .build()
    }

    /// Record standing in for a check that raised `error`.
    pub fn errored(name: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let name = name.into();
        Self::builder(name.clone())
            .passed(false)
            .summary(format!("{name} check failed to run: {error}"))
            .detail("error", error.to_string())
            .severity(Severity::High)
            .flag(Flag::Critical)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    pub fn fitted(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    pub fn plot_base64(&self) -> Option<&str> {
        self.plot_base64.as_deref()
    }

    pub fn plots(&self) -> &[PlotImage] {
        &self.plots
    }

    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    pub fn recommendation(&self) -> Option<&str> {
        self.recommendation.as_deref()
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }
}

/// Builder for [`AssumptionResult`].
///
/// The flag defaults to `info` for passing and `warning` for failing results
/// unless set explicitly. A recommendation is only kept on failure.
#[derive(Debug, Clone)]
pub struct AssumptionResultBuilder {
    name: String,
    passed: bool,
    summary: String,
    details: Details,
    residuals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    plot_base64: Option<String>,
    plots: Vec<PlotImage>,
    severity: Option<Severity>,
    recommendation: Option<String>,
    flag: Option<Flag>,
}

impl AssumptionResultBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            summary: String::new(),
            details: Details::new(),
            residuals: None,
            fitted: None,
            plot_base64: None,
            plots: Vec::new(),
            severity: None,
            recommendation: None,
            flag: None,
        }
    }

    pub fn passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key, value);
        self
    }

    pub fn residuals(mut self, residuals: &Col<f64>) -> Self {
        self.residuals = Some(residuals.iter().copied().collect());
        self
    }

    pub fn fitted(mut self, fitted: &Col<f64>) -> Self {
        self.fitted = Some(fitted.iter().copied().collect());
        self
    }

    pub fn plot_base64(mut self, image: Option<String>) -> Self {
        self.plot_base64 = image;
        self
    }

    pub fn plot(mut self, plot: PlotImage) -> Self {
        self.plots.push(plot);
        self
    }

    pub fn plots(mut self, plots: impl IntoIterator<Item = PlotImage>) -> Self {
        self.plots.extend(plots);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn recommendation(mut self, text: impl Into<String>) -> Self {
        self.recommendation = Some(text.into());
        self
    }

    pub fn flag(mut self, flag: Flag) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn build(self) -> AssumptionResult {
        let flag = self.flag.unwrap_or(if self.passed {
            Flag::Info
        } else {
            Flag::Warning
        });
        let recommendation = if self.passed {
            None
        } else {
            self.recommendation
        };

        AssumptionResult {
            name: self.name,
            passed: self.passed,
            summary: self.summary,
            details: self.details,
            residuals: self.residuals,
            fitted: self.fitted,
            plot_base64: self.plot_base64,
            plots: self.plots,
            severity: self.severity,
            recommendation,
            flag,
        }
    }
}
