//! Normality tests on residuals: Shapiro-Wilk, D'Agostino-Pearson and
//! Anderson-Darling.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::solvers::ModelError;
use crate::utils::{mean, sample_variance};

/// Shapiro-Wilk W statistic and p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub statistic: f64,
    pub p_value: f64,
}

/// D'Agostino-Pearson omnibus K² statistic and p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DAgostinoPearson {
    /// Normalised skewness z-score.
    pub skew_z: f64,
    /// Normalised kurtosis z-score.
    pub kurtosis_z: f64,
    /// K² = skew_z² + kurtosis_z².
    pub statistic: f64,
    pub p_value: f64,
}

/// Anderson-Darling A² statistic with critical values for a normal sample
/// of unknown mean and variance.
#[derive(Debug, Clone, PartialEq)]
pub struct AndersonDarling {
    pub statistic: f64,
    /// Critical values at [`ANDERSON_SIGNIFICANCE`] levels.
    pub critical_values: [f64; 5],
}

/// Significance levels (percent) matching [`AndersonDarling::critical_values`].
pub const ANDERSON_SIGNIFICANCE: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];

const ANDERSON_BASE_CRITICAL: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

impl AndersonDarling {
    /// Critical value at the given significance level in percent, if tabulated.
    pub fn critical_at(&self, significance: f64) -> Option<f64> {
        ANDERSON_SIGNIFICANCE
            .iter()
            .position(|&s| (s - significance).abs() < 1e-9)
            .map(|i| self.critical_values[i])
    }

    /// Whether the statistic stays below the critical value at `significance`.
    pub fn passes_at(&self, significance: f64) -> bool {
        self.critical_at(significance)
            .is_some_and(|crit| self.statistic < crit)
    }
}

fn standard_normal() -> Normal {
    Normal::standard()
}

/// Evaluate `c[0] + c[1] x + c[2] x² + ...`.
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Shapiro-Wilk test using Royston's (1995) approximation of the
/// coefficients and of the null distribution of W.
///
/// Valid for 3 ≤ n ≤ 5000. A sample with zero range yields W = 1, p = 1.
pub fn shapiro_wilk(values: &[f64]) -> Result<ShapiroWilk, ModelError> {
    const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
    const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
    const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
    const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
    const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
    const G: [f64; 2] = [-2.273, 0.459];

    let n = values.len();
    if n < 3 {
        return Err(ModelError::InsufficientObservations { needed: 3, got: n });
    }

    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if range <= 0.0 {
        return Ok(ShapiroWilk {
            statistic: 1.0,
            p_value: 1.0,
        });
    }

    let an = n as f64;
    let half = n / 2;
    let norm = standard_normal();

    // coefficients for the upper half of the order statistics, largest first
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let m: Vec<f64> = (1..=half)
            .map(|i| norm.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;

        let (first, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first..half {
            a[i] = -m[i] / fac;
        }
    }

    let x_mean = mean(&x);
    let ssq: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    let numerator: f64 = (0..half).map(|i| a[i] * (x[n - 1 - i] - x[i])).sum();
    let w = (numerator * numerator / ssq).min(1.0);

    let p_value = if n == 3 {
        let pi6 = 6.0 / std::f64::consts::PI;
        let stqr = std::f64::consts::FRAC_PI_3;
        (pi6 * (w.sqrt().asin() - stqr)).clamp(0.0, 1.0)
    } else {
        let w1 = (1.0 - w).ln();
        let (y, m, s) = if n <= 11 {
            let gamma = poly(&G, an);
            if w1 >= gamma {
                return Ok(ShapiroWilk {
                    statistic: w,
                    p_value: 1e-99,
                });
            }
            (
                -(gamma - w1).ln(),
                poly(&C3, an),
                poly(&C4, an).exp(),
            )
        } else {
            let ln_n = an.ln();
            (w1, poly(&C5, ln_n), poly(&C6, ln_n).exp())
        };
        norm.sf((y - m) / s)
    };

    Ok(ShapiroWilk {
        statistic: w,
        p_value,
    })
}

/// D'Agostino-Pearson omnibus test combining skewness and kurtosis.
///
/// Requires at least 8 observations. K² is χ²-distributed on two degrees of
/// freedom under normality.
pub fn dagostino_pearson(values: &[f64]) -> Result<DAgostinoPearson, ModelError> {
    let n = values.len();
    if n < 8 {
        return Err(ModelError::InsufficientObservations { needed: 8, got: n });
    }

    let an = n as f64;
    let m = mean(values);
    let moment = |k: i32| values.iter().map(|v| (v - m).powi(k)).sum::<f64>() / an;
    let m2 = moment(2);
    if m2 <= 0.0 {
        return Ok(DAgostinoPearson {
            skew_z: 0.0,
            kurtosis_z: 0.0,
            statistic: 0.0,
            p_value: 1.0,
        });
    }
    let skewness = moment(3) / m2.powf(1.5);
    let kurtosis = moment(4) / (m2 * m2);

    // skewness z-score
    let y = skewness * ((an + 1.0) * (an + 3.0) / (6.0 * (an - 2.0))).sqrt();
    let beta2 = 3.0 * (an * an + 27.0 * an - 70.0) * (an + 1.0) * (an + 3.0)
        / ((an - 2.0) * (an + 5.0) * (an + 7.0) * (an + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    let skew_z = delta * (y / alpha).asinh();

    // kurtosis z-score
    let expected = 3.0 * (an - 1.0) / (an + 1.0);
    let var_b2 = 24.0 * an * (an - 2.0) * (an - 3.0)
        / ((an + 1.0) * (an + 1.0) * (an + 3.0) * (an + 5.0));
    let xk = (kurtosis - expected) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (an * an - 5.0 * an + 2.0) / ((an + 7.0) * (an + 9.0))
        * (6.0 * (an + 3.0) * (an + 5.0) / (an * (an - 2.0) * (an - 3.0))).sqrt();
    let big_a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * big_a);
    let denom = 1.0 + xk * (2.0 / (big_a - 4.0)).sqrt();
    let term2 = if denom == 0.0 {
        f64::NAN
    } else {
        denom.signum() * ((1.0 - 2.0 / big_a) / denom.abs()).cbrt()
    };
    let kurtosis_z = (term1 - term2) / (2.0 / (9.0 * big_a)).sqrt();

    let statistic = skew_z * skew_z + kurtosis_z * kurtosis_z;
    let p_value = ChiSquared::new(2.0)
        .map(|dist| dist.sf(statistic))
        .unwrap_or(f64::NAN);

    Ok(DAgostinoPearson {
        skew_z,
        kurtosis_z,
        statistic,
        p_value,
    })
}

/// Anderson-Darling test for normality with estimated mean and variance.
///
/// Critical values use Stephens' small-sample adjustment
/// `c / (1 + 4/n - 25/n²)`.
pub fn anderson_darling(values: &[f64]) -> Result<AndersonDarling, ModelError> {
    let n = values.len();
    if n < 3 {
        return Err(ModelError::InsufficientObservations { needed: 3, got: n });
    }

    let an = n as f64;
    let adjust = 1.0 + 4.0 / an - 25.0 / (an * an);
    let critical_values = ANDERSON_BASE_CRITICAL.map(|c| c / adjust);

    let sd = sample_variance(values).sqrt();
    if sd.is_nan() || sd <= 0.0 {
        return Ok(AndersonDarling {
            statistic: 0.0,
            critical_values,
        });
    }

    let m = mean(values);
    let z: Vec<f64> = sorted(values).into_iter().map(|v| (v - m) / sd).collect();
    let norm = standard_normal();
    let log_cdf = |v: f64| norm.cdf(v).max(f64::MIN_POSITIVE).ln();
    let log_sf = |v: f64| norm.sf(v).max(f64::MIN_POSITIVE).ln();

    let s: f64 = (1..=n)
        .map(|i| (2 * i - 1) as f64 / an * (log_cdf(z[i - 1]) + log_sf(z[n - i])))
        .sum();

    Ok(AndersonDarling {
        statistic: -an - s,
        critical_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic standard normal sample from evenly spaced quantiles.
    fn normal_scores(n: usize) -> Vec<f64> {
        let norm = standard_normal();
        (0..n)
            .map(|i| norm.inverse_cdf((i as f64 + 0.5) / n as f64))
            .collect()
    }

    fn exponential_scores(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| -(1.0 - (i as f64 + 0.5) / n as f64).ln())
            .collect()
    }

    #[test]
    fn test_poly_horner() {
        assert!((poly(&[1.0, 2.0, 3.0], 2.0) - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_shapiro_wilk_normal_sample() {
        let sw = shapiro_wilk(&normal_scores(100)).expect("test");
        assert!(sw.statistic > 0.98, "W = {}", sw.statistic);
        assert!(sw.p_value > 0.5, "p = {}", sw.p_value);
    }

    #[test]
    fn test_shapiro_wilk_skewed_sample() {
        let sw = shapiro_wilk(&exponential_scores(100)).expect("test");
        assert!(sw.p_value < 0.001, "p = {}", sw.p_value);
    }

    #[test]
    fn test_shapiro_wilk_small_samples() {
        let sw = shapiro_wilk(&[1.0, 2.0, 3.0]).expect("test");
        assert!((sw.statistic - 1.0).abs() < 1e-12);
        assert!((sw.p_value - 1.0).abs() < 1e-6);

        let sw = shapiro_wilk(&[1.0, 2.0, 4.0, 7.0, 11.0]).expect("test");
        assert!(sw.statistic > 0.0 && sw.statistic <= 1.0);
        assert!((0.0..=1.0).contains(&sw.p_value));

        assert!(shapiro_wilk(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_shapiro_wilk_constant_sample() {
        let sw = shapiro_wilk(&[2.0; 10]).expect("test");
        assert_eq!(sw.p_value, 1.0);
    }

    #[test]
    fn test_dagostino_normal_vs_skewed() {
        let normal = dagostino_pearson(&normal_scores(200)).expect("test");
        assert!(normal.p_value > 0.5, "p = {}", normal.p_value);

        let skewed = dagostino_pearson(&exponential_scores(200)).expect("test");
        assert!(skewed.skew_z > 3.0);
        assert!(skewed.p_value < 0.001, "p = {}", skewed.p_value);
    }

    #[test]
    fn test_dagostino_needs_eight_points() {
        assert!(dagostino_pearson(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).is_err());
    }

    #[test]
    fn test_anderson_darling() {
        let normal = anderson_darling(&normal_scores(100)).expect("test");
        assert!(normal.passes_at(5.0), "A² = {}", normal.statistic);

        let skewed = anderson_darling(&exponential_scores(100)).expect("test");
        assert!(!skewed.passes_at(5.0), "A² = {}", skewed.statistic);
        assert!(skewed.statistic > skewed.critical_at(1.0).expect("tabulated"));
    }

    #[test]
    fn test_anderson_critical_values_adjusted() {
        let ad = anderson_darling(&normal_scores(50)).expect("test");
        let adjust = 1.0 + 4.0 / 50.0 - 25.0 / 2500.0;
        assert!((ad.critical_values[2] - 0.787 / adjust).abs() < 1e-12);
        assert!(ad.critical_at(7.0).is_none());
    }
}
