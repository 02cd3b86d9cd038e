//! Severity grading of a check statistic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How badly an assumption is violated. Ordered `Low < Moderate < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut points for a higher-is-worse statistic.
///
/// For lower-is-worse statistics such as R² or a p-value, classify the
/// negated value against [`SeverityThresholds::negated`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl SeverityThresholds {
    pub const fn new(high: f64, moderate: f64, low: f64) -> Self {
        Self {
            high,
            moderate,
            low,
        }
    }

    /// The same table with every cut point negated.
    pub fn negated(&self) -> Self {
        Self::new(-self.high, -self.moderate, -self.low)
    }

    /// Whether the cut points are finite and non-increasing from `high` to `low`.
    pub fn is_ordered(&self) -> bool {
        [self.high, self.moderate, self.low]
            .iter()
            .all(|v| v.is_finite())
            && self.high >= self.moderate
            && self.moderate >= self.low
    }
}

/// Grade `value`: `High` at or above `high`, `Moderate` at or above
/// `moderate`, otherwise `Low`.
///
/// The grade never decreases as `value` grows.
pub fn classify(value: f64, thresholds: &SeverityThresholds) -> Severity {
    if value >= thresholds.high {
        Severity::High
    } else if value >= thresholds.moderate {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

/// Worst severity in `severities`, or `None` when empty.
pub fn worst<I>(severities: I) -> Option<Severity>
where
    I: IntoIterator<Item = Severity>,
{
    severities.into_iter().max()
}
