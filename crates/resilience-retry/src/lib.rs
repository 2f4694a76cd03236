//! Retry interval policy: a pure `attempt -> wait_duration` function.
//!
//! This crate deliberately does not wrap a `tower::Service`, drive a retry
//! loop, or own a "max attempts" concept -- it answers exactly one question,
//! "how long should the caller wait before attempt `n`?", and leaves
//! scheduling the retry to a higher layer the caller builds on top
//! (an async loop, a `tower::Layer`, a cron-style scheduler, whatever fits).
//!
//! # Examples
//!
//! ```
//! use resilience_retry::IntervalPolicy;
//! use std::time::Duration;
//!
//! let policy = IntervalPolicy::exponential(Duration::from_millis(500), 2.0).unwrap();
//! assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(500));
//! assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(1000));
//! assert_eq!(policy.wait(3).unwrap(), Duration::from_millis(2000));
//! ```
//!
//! ## Randomized backoff with an injectable RNG
//!
//! ```
//! use resilience_retry::IntervalPolicy;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use std::time::Duration;
//!
//! let policy = IntervalPolicy::randomized(Duration::from_millis(1000), 0.5).unwrap();
//! let mut rng = StdRng::seed_from_u64(1);
//! let wait = policy.wait_with_rng(1, &mut rng).unwrap();
//! assert!(wait >= Duration::from_millis(500) && wait <= Duration::from_millis(1500));
//! ```

mod interval;

pub use interval::{CustomStep, IntervalError, IntervalPolicy};
