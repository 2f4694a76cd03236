//! Cross-module, observable-behavior tests for `IntervalPolicy`, covering
//! the literal end-to-end scenario from the spec this crate implements
//! (exponential backoff with I=500ms, m=2.0).

use resilience_retry::{IntervalError, IntervalPolicy};
use std::time::Duration;

#[test]
fn exponential_backoff_literal_scenario() {
    let policy = IntervalPolicy::exponential(Duration::from_millis(500), 2.0).unwrap();

    assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(500));
    assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(1000));
    assert_eq!(policy.wait(3).unwrap(), Duration::from_millis(2000));
    assert_eq!(policy.wait(4).unwrap(), Duration::from_millis(4000));
}

#[test]
fn fixed_interval_is_attempt_independent() {
    let policy = IntervalPolicy::fixed(Duration::from_millis(250)).unwrap();
    let waits: Vec<_> = (1..=20).map(|n| policy.wait(n).unwrap()).collect();
    assert!(waits.iter().all(|&w| w == Duration::from_millis(250)));
}

#[test]
fn custom_step_function_is_applied_iteratively() {
    // Doubles each time, starting from 100ms: 100, 200, 400, 800.
    let policy = IntervalPolicy::custom(Duration::from_millis(100), |prev| prev * 2).unwrap();
    assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(100));
    assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(200));
    assert_eq!(policy.wait(3).unwrap(), Duration::from_millis(400));
    assert_eq!(policy.wait(4).unwrap(), Duration::from_millis(800));
}

#[test]
fn invalid_construction_reports_the_offending_field() {
    let err = IntervalPolicy::fixed(Duration::from_millis(1)).unwrap_err();
    assert!(matches!(
        err,
        IntervalError::InvalidArgument {
            field: "initial_interval",
            ..
        }
    ));

    let err = IntervalPolicy::exponential(Duration::from_millis(500), 0.9).unwrap_err();
    assert!(matches!(
        err,
        IntervalError::InvalidArgument {
            field: "multiplier",
            ..
        }
    ));

    let err = IntervalPolicy::randomized(Duration::from_millis(500), 1.0).unwrap_err();
    assert!(matches!(
        err,
        IntervalError::InvalidArgument {
            field: "randomization_factor",
            ..
        }
    ));
}

#[test]
fn attempt_zero_is_always_rejected_regardless_of_variant() {
    let fixed = IntervalPolicy::fixed(Duration::from_millis(500)).unwrap();
    let exponential = IntervalPolicy::exponential(Duration::from_millis(500), 1.5).unwrap();
    let randomized = IntervalPolicy::randomized(Duration::from_millis(500), 0.2).unwrap();

    assert!(fixed.wait(0).is_err());
    assert!(exponential.wait(0).is_err());
    assert!(randomized.wait(0).is_err());
}
