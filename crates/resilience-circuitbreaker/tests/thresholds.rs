use resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, State};
use std::time::Duration;

fn breaker(threshold: f64) -> CircuitBreaker<&'static str> {
    let config = CircuitBreakerConfig::builder()
        .name("exact-threshold")
        .failure_rate_threshold(threshold)
        .sliding_window_size(10)
        .minimum_number_of_calls(10)
        .wait_duration_in_open(Duration::from_millis(100))
        .build()
        .unwrap();
    CircuitBreaker::new(config)
}

fn run(cb: &CircuitBreaker<&'static str>, failures: usize, total: usize) {
    for i in 0..total {
        let permission = cb.acquire_permission().unwrap();
        if i < failures {
            cb.on_error(permission, Duration::from_millis(1), "boom");
        } else {
            cb.on_success(permission, Duration::from_millis(1));
        }
    }
}

#[test]
fn failure_rate_exactly_at_threshold_trips() {
    let cb = breaker(50.0);
    // 5 failures, 5 successes = exactly 50%.
    run(&cb, 5, 10);
    assert_eq!(cb.state(), State::Open);
}

#[test]
fn failure_rate_just_below_threshold_stays_closed() {
    let cb = breaker(50.0);
    // 4 failures, 6 successes = 40%.
    run(&cb, 4, 10);
    assert_eq!(cb.state(), State::Closed);
}

#[test]
fn failure_rate_just_above_threshold_trips() {
    let cb = breaker(50.0);
    // 6 failures, 4 successes = 60%.
    run(&cb, 6, 10);
    assert_eq!(cb.state(), State::Open);
}

#[test]
fn zero_percent_threshold_is_rejected_at_construction() {
    // failure_rate_threshold's valid range is (0.0, 100.0]; 0.0 is excluded
    // because it would trip the circuit on the very first evaluated window
    // regardless of outcome.
    let result = CircuitBreakerConfig::<&'static str>::builder()
        .name("zero-threshold")
        .failure_rate_threshold(0.0)
        .build();
    assert!(result.is_err());
}

#[test]
fn near_zero_threshold_stays_closed_with_no_failures() {
    // 0% observed failure rate does not meet a threshold just above zero:
    // 0.0 >= 0.01 is false, so the circuit stays closed until at least one
    // failure is recorded.
    let cb = breaker(0.01);
    run(&cb, 0, 10);
    assert_eq!(cb.state(), State::Closed);
}

#[test]
fn near_zero_threshold_trips_on_a_single_failure() {
    // Even one failure out of ten is already >= a threshold this low.
    let cb = breaker(0.01);
    run(&cb, 1, 10);
    assert_eq!(cb.state(), State::Open);
}

#[test]
fn hundred_percent_threshold_requires_all_failures() {
    let cb = breaker(100.0);
    run(&cb, 9, 10);
    assert_eq!(cb.state(), State::Closed);

    let cb = breaker(100.0);
    run(&cb, 10, 10);
    assert_eq!(cb.state(), State::Open);
}
