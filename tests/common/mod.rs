//! Common test utilities and data generators.

#![allow(dead_code)]

use std::f64::consts::PI;

use faer::{Col, Mat};

/// Install a `tracing` subscriber honouring `RUST_LOG`; repeated calls are
/// no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Small seeded generator so every test sees the same data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform draw in the open interval (0, 1).
    pub fn uniform(&mut self) -> f64 {
        ((self.next_u64() >> 11) as f64 + 0.5) / (1u64 << 53) as f64
    }

    /// Normal draw by Box-Muller.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    pub fn exponential(&mut self, scale: f64) -> f64 {
        -scale * self.uniform().ln()
    }

    pub fn normals(&mut self, n: usize, mean: f64, std_dev: f64) -> Vec<f64> {
        (0..n).map(|_| self.normal(mean, std_dev)).collect()
    }
}

/// y = 3x + N(0, noise_std²) with x ~ N(0, 1).
pub fn generate_linear_data(n_samples: usize, noise_std: f64, seed: u64) -> (Col<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let x = rng.normals(n_samples, 0.0, 1.0);
    let noise = rng.normals(n_samples, 0.0, noise_std);
    (
        Col::from_fn(n_samples, |i| x[i]),
        Col::from_fn(n_samples, |i| 3.0 * x[i] + noise[i]),
    )
}

/// Like [`generate_linear_data`] but the noise spread grows with |x|.
pub fn generate_heteroscedastic_data(n_samples: usize, seed: u64) -> (Col<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let x = rng.normals(n_samples, 0.0, 1.0);
    let y: Vec<f64> = x
        .iter()
        .map(|&xi| 3.0 * xi + rng.normal(0.0, 0.5 + 0.5 * xi.abs()))
        .collect();
    (
        Col::from_fn(n_samples, |i| x[i]),
        Col::from_fn(n_samples, |i| y[i]),
    )
}

/// Two near-duplicate predictors, x2 = x1 + N(0, 0.01²), and
/// y = 2·x1 + 3·x2 + N(0, 1).
pub fn generate_multicollinear_data(n_samples: usize, seed: u64) -> (Mat<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let x1 = rng.normals(n_samples, 0.0, 1.0);
    let jitter = rng.normals(n_samples, 0.0, 0.01);
    let noise = rng.normals(n_samples, 0.0, 1.0);

    let x = Mat::from_fn(n_samples, 2, |i, j| if j == 0 { x1[i] } else { x1[i] + jitter[i] });
    let y = Col::from_fn(n_samples, |i| 2.0 * x[(i, 0)] + 3.0 * x[(i, 1)] + noise[i]);
    (x, y)
}

/// y = 2x + Exp(1): linear mean, right-skewed errors.
pub fn generate_skewed_data(n_samples: usize, seed: u64) -> (Col<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let x = rng.normals(n_samples, 0.0, 1.0);
    let errors: Vec<f64> = (0..n_samples).map(|_| rng.exponential(1.0)).collect();
    (
        Col::from_fn(n_samples, |i| x[i]),
        Col::from_fn(n_samples, |i| 2.0 * x[i] + errors[i]),
    )
}

/// x = 0..n, y = x + sin(linspace(0, 10π, n)).
pub fn generate_autocorrelated_data(n_samples: usize) -> (Col<f64>, Col<f64>) {
    let step = if n_samples > 1 {
        10.0 * PI / (n_samples - 1) as f64
    } else {
        0.0
    };
    (
        Col::from_fn(n_samples, |i| i as f64),
        Col::from_fn(n_samples, |i| i as f64 + (i as f64 * step).sin()),
    )
}

/// `n_features` independent N(0, 1) predictors and y = Σ (j+1)·x_j + N(0, 1).
pub fn generate_independent_predictors(
    n_samples: usize,
    n_features: usize,
    seed: u64,
) -> (Mat<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|_| rng.normals(n_samples, 0.0, 1.0))
        .collect();
    let noise = rng.normals(n_samples, 0.0, 1.0);

    let x = Mat::from_fn(n_samples, n_features, |i, j| columns[j][i]);
    let y = Col::from_fn(n_samples, |i| {
        (0..n_features).map(|j| (j + 1) as f64 * columns[j][i]).sum::<f64>() + noise[i]
    });
    (x, y)
}
