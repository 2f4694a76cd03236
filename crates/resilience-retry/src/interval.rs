//! Retry interval policies: pure functions from attempt number to wait duration.
//!
//! Every variant answers the same question -- "how long should the caller
//! wait before attempt `n`?" -- without knowing anything about the call
//! being retried. There is no sleeping, no event system, and no notion of
//! "max attempts" here; a higher layer (outside this crate) drives the loop
//! and decides when to stop.

use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The minimum `initial_interval` accepted by any variant's constructor.
const MIN_INITIAL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors raised when constructing or evaluating an [`IntervalPolicy`].
#[derive(Debug, Clone, Error)]
pub enum IntervalError {
    /// A configuration field or call argument was out of its valid range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },
}

fn require_attempt(attempt: u64) -> Result<(), IntervalError> {
    if attempt < 1 {
        return Err(IntervalError::InvalidArgument {
            field: "attempt",
            reason: "must be >= 1".to_string(),
        });
    }
    Ok(())
}

fn require_initial_interval(initial: Duration) -> Result<(), IntervalError> {
    if initial < MIN_INITIAL_INTERVAL {
        return Err(IntervalError::InvalidArgument {
            field: "initial_interval",
            reason: "must be at least 10ms".to_string(),
        });
    }
    Ok(())
}

fn require_multiplier(multiplier: f64) -> Result<(), IntervalError> {
    if !(multiplier >= 1.0) {
        return Err(IntervalError::InvalidArgument {
            field: "multiplier",
            reason: "must be >= 1.0".to_string(),
        });
    }
    Ok(())
}

fn require_randomization_factor(factor: f64) -> Result<(), IntervalError> {
    if !(0.0..1.0).contains(&factor) {
        return Err(IntervalError::InvalidArgument {
            field: "randomization_factor",
            reason: "must be in [0.0, 1.0)".to_string(),
        });
    }
    Ok(())
}

/// A pluggable `attempt -> wait_millis` function for [`IntervalPolicy::Custom`].
pub trait CustomStep: Send + Sync {
    /// Advances the previous interval (in milliseconds) to the next one.
    fn step(&self, previous_millis: u64) -> u64;
}

impl<F> CustomStep for F
where
    F: Fn(u64) -> u64 + Send + Sync,
{
    fn step(&self, previous_millis: u64) -> u64 {
        self(previous_millis)
    }
}

/// A validated backoff schedule: a pure function mapping a 1-indexed retry
/// attempt to the number of milliseconds to wait before making it.
///
/// Replaces what the teacher expresses as a family of `IntervalFunction`
/// trait objects (`FixedInterval`, `ExponentialBackoff`,
/// `ExponentialRandomBackoff`, `FnInterval`) with one validated value type;
/// the named constructors below are thin wrappers kept for ergonomics.
#[derive(Clone)]
pub enum IntervalPolicy {
    /// Always waits `initial_interval`.
    Fixed { initial_millis: u64 },
    /// Waits a uniform random sample from
    /// `[initial*(1-r), initial*(1+r)]`, independent of attempt number.
    Randomized {
        initial_millis: u64,
        randomization_factor: f64,
    },
    /// Waits `initial * multiplier^(attempt-1)`, truncated toward zero.
    Exponential {
        initial_millis: u64,
        multiplier: f64,
    },
    /// Applies [`IntervalPolicy::Randomized`]'s randomization to the
    /// exponential sample at the given attempt.
    ExponentialRandom {
        initial_millis: u64,
        multiplier: f64,
        randomization_factor: f64,
    },
    /// Applies a user-supplied step function `attempt-1` times to
    /// `initial_interval`.
    Custom {
        initial_millis: u64,
        step: Arc<dyn CustomStep>,
    },
}

impl fmt::Debug for IntervalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalPolicy::Fixed { initial_millis } => f
                .debug_struct("Fixed")
                .field("initial_millis", initial_millis)
                .finish(),
            IntervalPolicy::Randomized {
                initial_millis,
                randomization_factor,
            } => f
                .debug_struct("Randomized")
                .field("initial_millis", initial_millis)
                .field("randomization_factor", randomization_factor)
                .finish(),
            IntervalPolicy::Exponential {
                initial_millis,
                multiplier,
            } => f
                .debug_struct("Exponential")
                .field("initial_millis", initial_millis)
                .field("multiplier", multiplier)
                .finish(),
            IntervalPolicy::ExponentialRandom {
                initial_millis,
                multiplier,
                randomization_factor,
            } => f
                .debug_struct("ExponentialRandom")
                .field("initial_millis", initial_millis)
                .field("multiplier", multiplier)
                .field("randomization_factor", randomization_factor)
                .finish(),
            IntervalPolicy::Custom { initial_millis, .. } => f
                .debug_struct("Custom")
                .field("initial_millis", initial_millis)
                .field("step", &"<fn>")
                .finish(),
        }
    }
}

impl IntervalPolicy {
    /// The default initial interval used by the named constructors: 500ms.
    pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
    /// The default multiplier used by [`IntervalPolicy::exponential`] et al: 1.5.
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;
    /// The default randomization factor used by [`IntervalPolicy::randomized`]
    /// et al: 0.5.
    pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

    /// A constant wait of `initial_interval` for every attempt.
    pub fn fixed(initial_interval: Duration) -> Result<Self, IntervalError> {
        require_initial_interval(initial_interval)?;
        Ok(IntervalPolicy::Fixed {
            initial_millis: initial_interval.as_millis() as u64,
        })
    }

    /// A uniform random wait in `[initial*(1-r), initial*(1+r)]`, independent
    /// of attempt number.
    pub fn randomized(
        initial_interval: Duration,
        randomization_factor: f64,
    ) -> Result<Self, IntervalError> {
        require_initial_interval(initial_interval)?;
        require_randomization_factor(randomization_factor)?;
        Ok(IntervalPolicy::Randomized {
            initial_millis: initial_interval.as_millis() as u64,
            randomization_factor,
        })
    }

    /// Exponential backoff: `initial * multiplier^(attempt-1)`.
    pub fn exponential(initial_interval: Duration, multiplier: f64) -> Result<Self, IntervalError> {
        require_initial_interval(initial_interval)?;
        require_multiplier(multiplier)?;
        Ok(IntervalPolicy::Exponential {
            initial_millis: initial_interval.as_millis() as u64,
            multiplier,
        })
    }

    /// Exponential backoff with randomization applied to each sample.
    pub fn exponential_random(
        initial_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Result<Self, IntervalError> {
        require_initial_interval(initial_interval)?;
        require_multiplier(multiplier)?;
        require_randomization_factor(randomization_factor)?;
        Ok(IntervalPolicy::ExponentialRandom {
            initial_millis: initial_interval.as_millis() as u64,
            multiplier,
            randomization_factor,
        })
    }

    /// A user-supplied step function applied `attempt-1` times to
    /// `initial_interval`.
    pub fn custom<F>(initial_interval: Duration, step: F) -> Result<Self, IntervalError>
    where
        F: Fn(u64) -> u64 + Send + Sync + 'static,
    {
        require_initial_interval(initial_interval)?;
        Ok(IntervalPolicy::Custom {
            initial_millis: initial_interval.as_millis() as u64,
            step: Arc::new(step),
        })
    }

    /// `IntervalPolicy::exponential` with the library's defaults: 500ms
    /// initial interval, 1.5 multiplier.
    pub fn default_exponential() -> Self {
        Self::exponential(Self::DEFAULT_INITIAL_INTERVAL, Self::DEFAULT_MULTIPLIER)
            .expect("default values are always valid")
    }

    /// The wait duration before the given 1-indexed attempt, drawing
    /// randomness (if this variant needs any) from the thread-local RNG.
    pub fn wait(&self, attempt: u64) -> Result<Duration, IntervalError> {
        self.wait_with_rng(attempt, &mut rand::rng())
    }

    /// Like [`IntervalPolicy::wait`], but draws randomness from the supplied
    /// RNG instead of the thread-local default. Intended for deterministic
    /// tests of randomized variants.
    pub fn wait_with_rng<R: Rng + ?Sized>(
        &self,
        attempt: u64,
        rng: &mut R,
    ) -> Result<Duration, IntervalError> {
        require_attempt(attempt)?;
        let millis = match self {
            IntervalPolicy::Fixed { initial_millis } => *initial_millis,
            IntervalPolicy::Randomized {
                initial_millis,
                randomization_factor,
            } => randomize(*initial_millis, *randomization_factor, rng),
            IntervalPolicy::Exponential {
                initial_millis,
                multiplier,
            } => exponential_millis(*initial_millis, *multiplier, attempt),
            IntervalPolicy::ExponentialRandom {
                initial_millis,
                multiplier,
                randomization_factor,
            } => {
                let base = exponential_millis(*initial_millis, *multiplier, attempt);
                randomize(base, *randomization_factor, rng)
            }
            IntervalPolicy::Custom {
                initial_millis,
                step,
            } => {
                let mut value = *initial_millis;
                for _ in 1..attempt {
                    value = step.step(value);
                }
                value
            }
        };
        Ok(Duration::from_millis(millis))
    }
}

fn exponential_millis(initial_millis: u64, multiplier: f64, attempt: u64) -> u64 {
    let factor = multiplier.powi((attempt - 1) as i32);
    (initial_millis as f64 * factor) as u64
}

fn randomize<R: Rng + ?Sized>(base_millis: u64, randomization_factor: f64, rng: &mut R) -> u64 {
    if randomization_factor == 0.0 {
        return base_millis;
    }
    let base = base_millis as f64;
    let delta = base * randomization_factor;
    let low = (base - delta).max(0.0);
    let high = base + delta;
    rng.random_range(low..=high) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn attempt_below_one_is_rejected() {
        let policy = IntervalPolicy::fixed(Duration::from_millis(500)).unwrap();
        assert!(matches!(
            policy.wait(0),
            Err(IntervalError::InvalidArgument { field: "attempt", .. })
        ));
    }

    #[test]
    fn initial_interval_below_minimum_is_rejected() {
        assert!(IntervalPolicy::fixed(Duration::from_millis(5)).is_err());
    }

    #[test]
    fn multiplier_below_one_is_rejected() {
        assert!(IntervalPolicy::exponential(Duration::from_millis(500), 0.5).is_err());
    }

    #[test]
    fn randomization_factor_out_of_range_is_rejected() {
        assert!(IntervalPolicy::randomized(Duration::from_millis(500), 1.0).is_err());
        assert!(IntervalPolicy::randomized(Duration::from_millis(500), -0.1).is_err());
    }

    #[test]
    fn fixed_returns_the_same_value_for_every_attempt() {
        let policy = IntervalPolicy::fixed(Duration::from_millis(500)).unwrap();
        for attempt in 1..=10 {
            assert_eq!(policy.wait(attempt).unwrap(), Duration::from_millis(500));
        }
    }

    #[test]
    fn exponential_backoff_matches_the_literal_scenario() {
        // scenario 6: I=500, m=2.0 -> 500, 1000, 2000, 4000
        let policy = IntervalPolicy::exponential(Duration::from_millis(500), 2.0).unwrap();
        assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(500));
        assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(1000));
        assert_eq!(policy.wait(3).unwrap(), Duration::from_millis(2000));
        assert_eq!(policy.wait(4).unwrap(), Duration::from_millis(4000));
    }

    #[test]
    fn exponential_backoff_is_non_decreasing() {
        let policy = IntervalPolicy::exponential(Duration::from_millis(500), 1.5).unwrap();
        let mut previous = Duration::from_millis(0);
        for attempt in 1..=8 {
            let current = policy.wait(attempt).unwrap();
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn exponential_truncates_toward_zero() {
        // 500 * 1.5^1 = 750 exactly, 500 * 1.5^2 = 1125 exactly -- pick a
        // multiplier that produces a fractional millisecond to exercise
        // truncation.
        let policy = IntervalPolicy::exponential(Duration::from_millis(10), 1.3).unwrap();
        // 10 * 1.3^3 = 21.97 -> truncated to 21
        assert_eq!(policy.wait(4).unwrap(), Duration::from_millis(21));
    }

    #[test]
    fn randomized_draws_stay_within_bounds() {
        let policy = IntervalPolicy::randomized(Duration::from_millis(1000), 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let wait = policy.wait_with_rng(1, &mut rng).unwrap();
            assert!(wait >= Duration::from_millis(500));
            assert!(wait <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn randomized_is_deterministic_given_a_seeded_rng() {
        let policy = IntervalPolicy::randomized(Duration::from_millis(1000), 0.5).unwrap();
        let a = policy
            .wait_with_rng(1, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = policy
            .wait_with_rng(1, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exponential_random_draws_stay_within_bounds_of_the_exponential_sample() {
        let policy =
            IntervalPolicy::exponential_random(Duration::from_millis(500), 2.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        for attempt in 1..=4 {
            let base = 500.0 * 2f64.powi((attempt - 1) as i32);
            let wait = policy.wait_with_rng(attempt, &mut rng).unwrap();
            assert!(wait.as_millis() as f64 >= base * 0.5);
            assert!(wait.as_millis() as f64 <= base * 1.5);
        }
    }

    #[test]
    fn custom_applies_the_step_function_attempt_minus_one_times() {
        let policy = IntervalPolicy::custom(Duration::from_millis(100), |previous| previous + 50)
            .unwrap();
        assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(100));
        assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(150));
        assert_eq!(policy.wait(3).unwrap(), Duration::from_millis(200));
    }

    #[test]
    fn default_exponential_uses_documented_defaults() {
        let policy = IntervalPolicy::default_exponential();
        assert_eq!(policy.wait(1).unwrap(), Duration::from_millis(500));
        assert_eq!(policy.wait(2).unwrap(), Duration::from_millis(750));
    }
}
