//! Property-based tests for severity grading, fitted models and thresholds.

mod common;

use approx::assert_relative_eq;
use common::{generate_linear_data, Lcg};
use faer::{Col, Mat};
use proptest::prelude::*;
use regcheck::core::classify;
use regcheck::prelude::*;

fn ordered_thresholds() -> impl Strategy<Value = SeverityThresholds> {
    prop::array::uniform3(-1e3f64..1e3).prop_map(|mut cuts| {
        cuts.sort_by(|a, b| b.total_cmp(a));
        SeverityThresholds::new(cuts[0], cuts[1], cuts[2])
    })
}

fn random_design(seed: u64, n: usize, p: usize) -> (Mat<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let columns: Vec<Vec<f64>> = (0..p).map(|_| rng.normals(n, 0.0, 2.0)).collect();
    let noise = rng.normals(n, 0.0, 1.0);
    let x = Mat::from_fn(n, p, |i, j| columns[j][i]);
    let y = Col::from_fn(n, |i| {
        1.5 + (0..p).map(|j| (j as f64 - 0.5) * columns[j][i]).sum::<f64>() + noise[i]
    });
    (x, y)
}

proptest! {
    #[test]
    fn prop_severity_is_monotone(
        thresholds in ordered_thresholds(),
        a in -2e3f64..2e3,
        b in -2e3f64..2e3,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify(lo, &thresholds) <= classify(hi, &thresholds));
    }

    #[test]
    fn prop_negated_table_inverts_direction(
        thresholds in ordered_thresholds(),
        a in -2e3f64..2e3,
        b in -2e3f64..2e3,
    ) {
        // lower-is-worse: a smaller value never grades better
        let table = thresholds.negated();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify(-lo, &table) >= classify(-hi, &table));
    }

    #[test]
    fn prop_residuals_plus_fitted_recover_y(
        seed in any::<u64>(),
        n in 12usize..80,
        p in 1usize..4,
    ) {
        let (x, y) = random_design(seed, n, p);
        for model_type in ModelType::ALL {
            let model = fit_model(model_type, &x, &y).expect("fit");
            let residuals = model.residuals().expect("residuals");
            let fitted = model.fitted().expect("fitted");
            for i in 0..n {
                let scale = y[i].abs().max(1.0);
                prop_assert!(
                    (residuals[i] + fitted[i] - y[i]).abs() <= 1e-4 * scale,
                    "{model_type}: row {i}"
                );
            }
        }
    }

    #[test]
    fn prop_summary_r_squared_is_a_fraction(seed in any::<u64>(), n in 12usize..60) {
        let (x, y) = random_design(seed, n, 2);
        let model = fit_model(ModelType::Linear, &x, &y).expect("fit");
        let r2 = model.summary().expect("summary").r_squared;
        prop_assert!((0.0..=1.0).contains(&r2));
    }
}

#[test]
fn test_linearity_threshold_is_exclusive() {
    let (x, y) = generate_linear_data(80, 3.0, 17);
    let r2 = Dispatcher::default()
        .run_one("linearity", &x, &y, false)
        .expect("run")
        .details()
        .number("r_squared")
        .expect("r2");

    let with_threshold = |threshold: f64| {
        let config = DiagnosticsConfig::builder()
            .r2_threshold(threshold)
            .build()
            .expect("valid config");
        Dispatcher::new(CheckRegistry::with_builtin_checks(), config)
            .run_one("linearity", &x, &y, false)
            .expect("run")
            .passed()
    };

    assert!(with_threshold(r2 - 1e-3));
    assert!(!with_threshold(r2));
    assert!(!with_threshold(r2 + 1e-3));
}

#[test]
fn test_predict_matches_fitted_on_training_rows() {
    let (x, y) = random_design(99, 40, 3);
    let model = fit_model(ModelType::Linear, &x, &y).expect("fit");

    let predicted = model.predict(&x).expect("predict");
    let fitted = model.fitted().expect("fitted");
    for i in 0..40 {
        assert_relative_eq!(predicted[i], fitted[i], epsilon = 1e-8);
    }

    let narrow = Mat::from_fn(3, 2, |i, j| (i + j) as f64);
    assert!(matches!(
        model.predict(&narrow),
        Err(regcheck::solvers::ModelError::ShapeMismatch { expected: 3, got: 2 })
    ));
}
