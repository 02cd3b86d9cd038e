//! Registry and dispatcher integration tests.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::{generate_linear_data, generate_multicollinear_data, init_logging};
use faer::Col;
use regcheck::core::Flag;
use regcheck::prelude::*;

fn failing_registry() -> CheckRegistry {
    let mut registry = CheckRegistry::with_builtin_checks();
    registry
        .register("always_fails", &ModelType::ALL, "raises on every input", |_ctx| {
            Err(DiagnosticError::NumericalFailure {
                check: "always_fails".into(),
                metric: "statistic".into(),
            })
        })
        .expect("fresh name");
    registry
}

// ============================================================================
// Registry Completeness
// ============================================================================

#[test]
fn test_run_all_returns_exactly_the_checks_for_the_model_type() {
    init_logging();
    let (x, y) = generate_linear_data(120, 1.0, 5);
    let dispatcher = Dispatcher::default();

    for model_type in ModelType::ALL {
        let (results, _) = dispatcher
            .run_all(&x, &y, model_type, false)
            .expect("run should succeed");

        let expected: Vec<&str> = dispatcher
            .registry()
            .all_for_model_type(model_type)
            .into_iter()
            .map(CheckEntry::name)
            .collect();
        assert_eq!(results.names(), expected, "model type {model_type}");
    }
}

#[test]
fn test_every_result_is_named_after_its_check() {
    let (x, y) = generate_multicollinear_data(100, 9);
    let (results, _) = Dispatcher::default()
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("run should succeed");

    for (name, result) in results.iter() {
        assert_eq!(name, result.name());
        assert!(result.severity().is_some());
        assert!(!result.summary().is_empty());
        if result.passed() {
            assert!(result.recommendation().is_none());
        }
    }
}

#[test]
fn test_unknown_check_name_is_an_error() {
    let (x, y) = generate_linear_data(30, 1.0, 1);

    let err = Dispatcher::default()
        .run_one("banana", &x, &y, false)
        .expect_err("banana is not a check");

    assert!(matches!(err, DiagnosticError::UnknownCheck(ref name) if name == "banana"));
    assert_eq!(err.to_string(), "unknown check 'banana'");
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = CheckRegistry::with_builtin_checks();
    let err = registry
        .register("normality", &ModelType::ALL, "shadow", |_ctx| {
            Ok(AssumptionResult::builder("normality").passed(true).build())
        })
        .expect_err("duplicate");

    assert!(matches!(err, DiagnosticError::DuplicateCheck(ref name) if name == "normality"));
    assert_eq!(registry.len(), BUILTIN_CHECK_COUNT);
}

const BUILTIN_CHECK_COUNT: usize = regcheck::BUILTIN_CHECKS.len();

#[test]
fn test_three_observations_complete_every_check() {
    let x = Col::from_fn(3, |i| i as f64);
    let y = Col::from_fn(3, |i| [1.0, 3.0, 2.0][i]);

    let (results, _) = Dispatcher::default()
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("tiny samples degrade instead of aborting");

    assert_eq!(results.len(), BUILTIN_CHECK_COUNT);
    for name in ["normality", "multicollinearity", "influence"] {
        let result = results.get(name).expect("ran");
        assert!(result.passed(), "{name}");
        assert!(result.details().contains_key("note"), "{name}");
    }
}

// ============================================================================
// Custom Checks
// ============================================================================

#[test]
fn test_custom_check_reads_shared_model() {
    let mut registry = CheckRegistry::new();
    registry
        .register("mean_residual", &[ModelType::Linear], "mean of residuals", |ctx| {
            let residuals = ctx.model()?.residuals()?;
            let mean = residuals.iter().sum::<f64>() / residuals.nrows() as f64;
            Ok(AssumptionResult::builder("mean_residual")
                .passed(mean.abs() < 1e-8)
                .summary(format!("mean residual = {mean:.2e}"))
                .detail("mean_residual", mean)
                .build())
        })
        .expect("register");

    let (x, y) = generate_linear_data(80, 1.0, 13);
    let dispatcher = Dispatcher::new(registry, DiagnosticsConfig::default());

    let (results, _) = dispatcher
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("run should succeed");
    assert_eq!(results.names(), vec!["mean_residual"]);
    assert!(results.all_passed());

    // not registered for robust fits
    let (results, _) = dispatcher
        .run_all(&x, &y, ModelType::Robust, false)
        .expect("run should succeed");
    assert!(results.is_empty());
}

// ============================================================================
// Failure Policy
// ============================================================================

#[test]
fn test_abort_policy_returns_the_error() {
    let (x, y) = generate_linear_data(60, 1.0, 2);
    let dispatcher = Dispatcher::new(failing_registry(), DiagnosticsConfig::default());

    let err = dispatcher
        .run_all(&x, &y, ModelType::Linear, false)
        .expect_err("abort on failure");

    assert!(matches!(err, DiagnosticError::NumericalFailure { ref check, .. } if check == "always_fails"));
}

#[test]
fn test_isolate_policy_records_the_error_and_continues() {
    init_logging();
    let (x, y) = generate_linear_data(60, 1.0, 2);
    let config = DiagnosticsConfig::builder()
        .failure_policy(FailurePolicy::Isolate)
        .build()
        .expect("valid config");
    let dispatcher = Dispatcher::new(failing_registry(), config);

    let (results, _) = dispatcher
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("isolated failures do not abort");

    assert_eq!(results.len(), BUILTIN_CHECK_COUNT + 1);
    let failed = results.get("always_fails").expect("recorded");
    assert!(!failed.passed());
    assert_eq!(failed.flag(), Flag::Critical);
    assert_eq!(failed.severity(), Some(Severity::High));
    assert!(failed
        .details()
        .get("error")
        .and_then(DetailValue::as_text)
        .is_some_and(|text| text.contains("always_fails")));
    assert!(results.get("linearity").expect("linearity ran").passed());
    assert_eq!(results.worst_severity(), Some(Severity::High));
}

#[test]
fn test_run_one_ignores_isolation() {
    let (x, y) = generate_linear_data(60, 1.0, 2);
    let config = DiagnosticsConfig::builder()
        .failure_policy(FailurePolicy::Isolate)
        .build()
        .expect("valid config");
    let dispatcher = Dispatcher::new(failing_registry(), config);

    assert!(dispatcher.run_one("always_fails", &x, &y, false).is_err());
}

#[test]
fn test_misnamed_result_is_isolated_under_its_registered_name() {
    let (x, y) = generate_linear_data(60, 1.0, 2);
    let mut registry = CheckRegistry::new();
    registry
        .register("named_wrong", &ModelType::ALL, "returns another name", |_ctx| {
            Ok(AssumptionResult::builder("something_else").passed(true).build())
        })
        .expect("register");
    let config = DiagnosticsConfig::builder()
        .failure_policy(FailurePolicy::Isolate)
        .build()
        .expect("valid config");

    let (results, _) = Dispatcher::new(registry, config)
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("isolated");

    let result = results.get("named_wrong").expect("recorded under registry key");
    assert_eq!(result.name(), "named_wrong");
    assert!(!result.passed());
    assert!(results.get("something_else").is_none());
}

// ============================================================================
// Parallel Execution
// ============================================================================

#[test]
fn test_parallel_run_matches_sequential_run() {
    let (x, y) = generate_multicollinear_data(150, 21);
    let sequential = Dispatcher::default();
    let parallel = Dispatcher::new(
        CheckRegistry::with_builtin_checks(),
        DiagnosticsConfig::builder()
            .parallel(true)
            .build()
            .expect("valid config"),
    );

    let (a, _) = sequential
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("sequential run");
    let (b, _) = parallel
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("parallel run");

    assert_eq!(a, b);
}

// ============================================================================
// Plots and Serialization
// ============================================================================

#[test]
fn test_plots_decode_to_svg() {
    let (x, y) = generate_linear_data(100, 1.0, 8);

    let result = Dispatcher::default()
        .run_one("linearity", &x, &y, true)
        .expect("run should succeed");

    let encoded = result.plot_base64().expect("plot requested");
    let svg = String::from_utf8(STANDARD.decode(encoded).expect("valid base64")).expect("utf-8");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Residuals vs Fitted"));
}

#[test]
fn test_no_plots_unless_requested() {
    let (x, y) = generate_linear_data(100, 1.0, 8);
    let (results, _) = Dispatcher::default()
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("run should succeed");

    for (_, result) in results.iter() {
        assert!(result.plot_base64().is_none());
        assert!(result.plots().is_empty());
    }
}

#[test]
fn test_results_serialize_to_json() {
    let (x, y) = generate_linear_data(100, 1.0, 8);
    let (results, _) = Dispatcher::default()
        .run_all(&x, &y, ModelType::Linear, false)
        .expect("run should succeed");

    let json = serde_json::to_value(&results).expect("serializable");

    let linearity = &json["linearity"];
    assert_eq!(linearity["name"], "linearity");
    assert!(linearity["passed"].is_boolean());
    assert!(linearity["details"]["r_squared"].is_f64());
    assert!(linearity["residuals"].as_array().is_some_and(|r| r.len() == 100));
    assert!(["low", "moderate", "high"].contains(&linearity["severity"].as_str().unwrap_or("")));

    assert!(linearity.get("plots").is_none());

    let multicollinearity = &json["multicollinearity"];
    assert_eq!(multicollinearity["details"]["status"], "not applicable");
    assert!(multicollinearity.get("residuals").is_none());
    assert_eq!(multicollinearity["flag"], "info");
}

#[test]
fn test_plot_records_serialize_title_type_and_image() {
    let (x, y) = generate_linear_data(100, 1.0, 8);
    let result = Dispatcher::default()
        .run_one("normality", &x, &y, true)
        .expect("run should succeed");

    let json = serde_json::to_value(&result).expect("serializable");
    let plots = json["plots"].as_array().expect("plots requested");

    assert_eq!(plots.len(), 2);
    assert_eq!(plots[0]["type"], "qq");
    assert_eq!(plots[1]["type"], "histogram");
    assert!(plots[0]["title"].is_string());
    assert!(plots[0]["image"].is_string());
    assert!(plots[0].get("kind").is_none());
}
