//! Tests for configuration validation.
//!
//! Builder methods panic on nonsensical values; `validate()` reports the
//! same problems on hand-built configurations.

use std::time::Duration;

use safety_oracle::{Config, ConfigError, Safety, SafetyOracle};

// =============================================================================
// BUDGETS
// =============================================================================

#[test]
#[should_panic(expected = "max_n must be positive")]
fn max_n_zero_panics() {
    let _ = SafetyOracle::new().max_n(0);
}

#[test]
#[should_panic(expected = "max_memory_bytes must be positive")]
fn max_memory_zero_panics() {
    let _ = SafetyOracle::new().max_memory_bytes(0);
}

#[test]
#[should_panic(expected = "time_budget must be positive")]
fn time_budget_zero_panics() {
    let _ = SafetyOracle::new().time_budget(Duration::ZERO);
}

#[test]
fn budgets_round_trip_through_builder() {
    let oracle = SafetyOracle::new()
        .max_n(1)
        .max_memory_bytes(1)
        .time_budget(Duration::from_nanos(1));
    let config = oracle.config();
    assert_eq!(config.max_n, 1);
    assert_eq!(config.max_memory_bytes, 1);
    assert_eq!(config.time_budget, Duration::from_nanos(1));
    assert!(config.validate().is_ok());
}

// =============================================================================
// STEP BOUNDS
// =============================================================================

#[test]
fn equal_step_bounds_valid() {
    let oracle = SafetyOracle::new().min_execution_steps(3).max_execution_steps(3);
    assert_eq!(oracle.config().min_steps_per_n, Some(3));
    assert_eq!(oracle.config().max_steps_per_n, Some(3));
}

#[test]
#[should_panic(expected = "min_execution_steps must be <= max_execution_steps")]
fn min_above_max_panics() {
    let _ = SafetyOracle::new().max_execution_steps(2).min_execution_steps(3);
}

#[test]
fn validate_reports_inverted_bounds() {
    let config = Config {
        min_steps_per_n: Some(9),
        max_steps_per_n: Some(1),
        ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert_eq!(err, ConfigError::StepBoundsInverted { min: 9, max: 1 });
    assert_eq!(
        err.to_string(),
        "min_execution_steps (9) exceeds max_execution_steps (1)"
    );
}

// =============================================================================
// REFERENCE SCALES
// =============================================================================

#[test]
#[should_panic(expected = "noise_reference_scale must be positive")]
fn negative_noise_scale_panics() {
    let _ = SafetyOracle::new().noise_reference_scale(-1.0);
}

#[test]
#[should_panic(expected = "growth_reference_scale must be positive")]
fn infinite_growth_scale_panics() {
    let _ = SafetyOracle::new().growth_reference_scale(f64::INFINITY);
}

#[test]
fn validate_reports_bad_scale() {
    let config = Config {
        noise_reference_scale: 0.0,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidScale {
            name: "noise_reference_scale",
            ..
        })
    ));
}

// =============================================================================
// MISSING THRESHOLDS ARE PERMISSIVE
// =============================================================================

#[test]
fn flags_without_thresholds_are_valid() {
    let config = Config::new().require_safety(Safety::MemSafe | Safety::CPUSafe | Safety::IOSafe);
    assert!(config.validate().is_ok());
    assert_eq!(config.max_allocs_per_n, None);
    assert_eq!(config.max_steps_per_n, None);
}
