use resilience_circuitbreaker::clock::test_support::FakeClock;
use resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, SlidingWindowType, State};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn time_window_fills_and_evaluates() {
    let clock = Arc::new(FakeClock::new());
    let config = CircuitBreakerConfig::<&'static str>::builder()
        .name("time-test")
        .clock(clock.clone())
        .sliding_window_type(SlidingWindowType::TimeBased)
        .sliding_window_duration(Duration::from_millis(500))
        .sliding_window_size(10)
        .failure_rate_threshold(50.0)
        .minimum_number_of_calls(3)
        .wait_duration_in_open(Duration::from_millis(100))
        .build()
        .unwrap();
    let cb = CircuitBreaker::new(config);

    for _ in 0..3 {
        let permission = cb.acquire_permission().unwrap();
        cb.on_error(permission, Duration::from_millis(1), "boom");
        clock.advance(Duration::from_millis(50));
    }

    assert_eq!(cb.state(), State::Open);
}

#[test]
fn old_buckets_age_out_of_the_window() {
    let clock = Arc::new(FakeClock::new());
    let config = CircuitBreakerConfig::<&'static str>::builder()
        .name("cleanup-test")
        .clock(clock.clone())
        .sliding_window_type(SlidingWindowType::TimeBased)
        .sliding_window_duration(Duration::from_millis(200))
        .sliding_window_size(4)
        .failure_rate_threshold(50.0)
        .minimum_number_of_calls(2)
        .wait_duration_in_open(Duration::from_millis(50))
        .build()
        .unwrap();
    let cb = CircuitBreaker::new(config);

    for _ in 0..2 {
        let permission = cb.acquire_permission().unwrap();
        cb.on_error(permission, Duration::from_millis(1), "boom");
    }
    assert_eq!(cb.state(), State::Open);

    // Past the wait duration, the circuit lazily moves to half-open; record
    // a success there to return to closed, then let the old failure
    // buckets fully age out before checking the window is clean.
    clock.advance(Duration::from_millis(60));
    let permission = cb.acquire_permission().unwrap();
    assert_eq!(cb.state(), State::HalfOpen);
    cb.on_success(permission, Duration::from_millis(1));
    assert_eq!(cb.state(), State::Closed);

    clock.advance(Duration::from_millis(250));
    for _ in 0..2 {
        let permission = cb.acquire_permission().unwrap();
        cb.on_success(permission, Duration::from_millis(1));
    }
    assert_eq!(cb.state(), State::Closed);
}
