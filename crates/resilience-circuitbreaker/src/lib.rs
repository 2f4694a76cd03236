//! A circuit breaker core: state machine plus sliding-window aggregation.
//!
//! A circuit breaker prevents a caller from hammering a dependency that is
//! already failing. It tracks recent call outcomes in a sliding window and,
//! once the failure rate (or slow-call rate) crosses a threshold, stops
//! permitting new calls until the dependency has had a chance to recover.
//!
//! ## States
//! - **Closed**: calls are permitted; outcomes are recorded.
//! - **Open**: calls are rejected until `wait_duration_in_open` elapses.
//! - **Half-Open**: a limited number of trial calls decide whether to
//!   return to `Closed` or back to `Open`.
//! - **Disabled**: an admin override; every call is permitted, nothing is
//!   recorded.
//! - **ForcedOpen**: an admin override; every call is rejected.
//!
//! This crate does not wrap a `tower::Service` or any other callable. The
//! caller drives the protocol explicitly:
//!
//! ```rust
//! use resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::{Duration, Instant};
//!
//! let config = CircuitBreakerConfig::<String>::builder()
//!     .name("payments-api")
//!     .failure_rate_threshold(50.0)
//!     .sliding_window_size(20)
//!     .wait_duration_in_open(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//! let breaker = CircuitBreaker::new(config);
//!
//! match breaker.acquire_permission() {
//!     Ok(permission) => {
//!         let start = Instant::now();
//!         let result: Result<(), String> = Ok(()); // call the dependency here
//!         match result {
//!             Ok(_) => breaker.on_success(permission, start.elapsed()),
//!             Err(e) => {
//!                 // on_error records the outcome and hands the original
//!                 // error back, wrapped, for the caller to propagate.
//!                 let _ = breaker.on_error(permission, start.elapsed(), e);
//!             }
//!         }
//!     }
//!     Err(rejected) => {
//!         eprintln!("call rejected: {rejected}");
//!     }
//! }
//! ```
//!
//! ## Time-based sliding window
//!
//! ```rust
//! use resilience_circuitbreaker::{CircuitBreakerConfig, SlidingWindowType};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::<String>::builder()
//!     .sliding_window_type(SlidingWindowType::TimeBased)
//!     .sliding_window_duration(Duration::from_secs(60))
//!     .sliding_window_size(12) // 12 buckets of 5s each
//!     .minimum_number_of_calls(10)
//!     .build()
//!     .unwrap();
//! ```

pub mod circuit;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod window;

pub use circuit::{CircuitBreaker, Permission, State};
pub use classifier::{CallOutcome, DefaultClassifier, ErrorClassifier, FnClassifier};
pub use clock::{Clock, SystemClock};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder, SlidingWindowType};
pub use error::{CallNotPermitted, CircuitBreakerError, ConfigError};
pub use events::CircuitBreakerEvent;
pub use window::Snapshot;
