//! The circuit breaker state machine.

use crate::classifier::CallOutcome;
use crate::config::CircuitBreakerConfig;
use crate::error::{CallNotPermitted, CircuitBreakerError};
use crate::events::CircuitBreakerEvent;
use crate::window::{MetricsWindow, Snapshot};
use resilience_core::ResilienceEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The state a circuit breaker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Calls are permitted; outcomes are recorded and evaluated against the
    /// configured thresholds.
    Closed,
    /// Calls are rejected until `wait_duration_in_open` elapses, at which
    /// point the breaker lazily transitions to `HalfOpen`.
    Open,
    /// A limited number of trial calls are permitted; their outcome decides
    /// whether the breaker returns to `Closed` or back to `Open`.
    HalfOpen,
    /// An administrative override: every call is permitted and outcomes are
    /// not recorded.
    Disabled,
    /// An administrative override: every call is rejected regardless of the
    /// call history.
    ForcedOpen,
}

impl State {
    fn as_u8(self) -> u8 {
        match self {
            State::Closed => 0,
            State::Open => 1,
            State::HalfOpen => 2,
            State::Disabled => 3,
            State::ForcedOpen => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Closed,
            1 => State::Open,
            2 => State::HalfOpen,
            3 => State::Disabled,
            _ => State::ForcedOpen,
        }
    }
}

/// A token proving a call was permitted through `acquire_permission`.
///
/// Must be passed back through exactly one of `on_success`, `on_error`, or
/// `release_permission`. A permission carries the generation it was issued
/// under; if the breaker has since transitioned state (including via an
/// admin override racing with an in-flight call), reporting it back is a
/// silent no-op rather than corrupting the new generation's counters.
#[derive(Debug, Clone, Copy)]
pub struct Permission {
    generation: u64,
}

struct Inner {
    state: State,
    generation: u64,
    window: MetricsWindow,
    half_open_permits_issued: usize,
    half_open_completed: usize,
    opened_at: Option<Instant>,
}

fn pack(generation: u64, state: State) -> u64 {
    (generation << 8) | state.as_u8() as u64
}

fn unpack(word: u64) -> (u64, State) {
    (word >> 8, State::from_u8((word & 0xFF) as u8))
}

/// A circuit breaker guarding calls identified by the caller's own error
/// type `E`.
///
/// This type does not wrap a callable and is not a `tower::Service`: the
/// caller drives the protocol explicitly by calling `acquire_permission`
/// before attempting the guarded operation and reporting its outcome
/// through `on_success`/`on_error` afterward.
pub struct CircuitBreaker<E> {
    name: String,
    config: CircuitBreakerConfig<E>,
    inner: Mutex<Inner>,
    state_word: AtomicU64,
}

impl<E> CircuitBreaker<E> {
    /// Builds a new circuit breaker from a validated configuration.
    pub fn new(config: CircuitBreakerConfig<E>) -> Self {
        let name = config.name.clone();
        let window = Self::build_window(&config);
        let inner = Inner {
            state: State::Closed,
            generation: 0,
            window,
            half_open_permits_issued: 0,
            half_open_completed: 0,
            opened_at: None,
        };
        Self {
            name,
            config,
            inner: Mutex::new(inner),
            state_word: AtomicU64::new(pack(0, State::Closed)),
        }
    }

    fn build_window(config: &CircuitBreakerConfig<E>) -> MetricsWindow {
        match config.sliding_window_type {
            crate::config::SlidingWindowType::CountBased => MetricsWindow::count_based(
                config.sliding_window_size,
                config.minimum_number_of_calls as u32,
                config.clock.clone(),
            ),
            crate::config::SlidingWindowType::TimeBased => MetricsWindow::time_based(
                config
                    .sliding_window_duration
                    .expect("validated by CircuitBreakerConfigBuilder::build"),
                config.sliding_window_size,
                config.minimum_number_of_calls as u32,
                config.clock.clone(),
            ),
        }
    }

    /// The name given to this breaker at configuration time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A lock-free read of the current state, suitable for frequent polling
    /// (health checks, dashboards) without contending with call traffic.
    pub fn state(&self) -> State {
        unpack(self.state_word.load(Ordering::Acquire)).1
    }

    /// The current sliding-window aggregate.
    pub fn metrics(&self) -> Snapshot {
        let inner = self.inner.lock().unwrap();
        inner.window.snapshot()
    }

    /// Returns true once an `Open` breaker's wait duration has elapsed.
    ///
    /// This does not transition the breaker itself -- that happens lazily
    /// the next time `acquire_permission` is called -- but lets an external
    /// scheduler decide to call `transition_to_half_open` proactively.
    /// Racing with a concurrent admin transition is safe: `transition_to_*`
    /// checks the current state before acting, so a late hint that no
    /// longer applies is a no-op.
    pub fn is_open_expiry_passed_hint(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.state == State::Open
            && inner.opened_at.is_some_and(|opened| {
                self.config.clock.now() >= opened + self.config.wait_duration_in_open
            })
    }

    /// Asks whether a call may proceed.
    ///
    /// On success, returns a [`Permission`] that must be reported back
    /// through `on_success`, `on_error`, or `release_permission`. On
    /// failure, returns a [`CallNotPermitted`] describing why.
    pub fn acquire_permission(&self) -> Result<Permission, CallNotPermitted> {
        let mut inner = self.inner.lock().unwrap();
        let now = self.config.clock.now();

        if inner.state == State::Open {
            let expired = inner
                .opened_at
                .is_some_and(|opened| now >= opened + self.config.wait_duration_in_open);
            if expired {
                self.transition_to(&mut inner, State::HalfOpen);
            }
        }

        let granted = match inner.state {
            State::Closed | State::Disabled => true,
            State::ForcedOpen | State::Open => false,
            State::HalfOpen => {
                if inner.half_open_permits_issued < self.config.permitted_calls_in_half_open {
                    inner.half_open_permits_issued += 1;
                    true
                } else {
                    false
                }
            }
        };

        let state = inner.state;
        if granted {
            let permission = Permission {
                generation: inner.generation,
            };
            self.emit(CircuitBreakerEvent::PermissionAcquired {
                name: self.name.clone(),
                state,
                timestamp: now,
            });
            Ok(permission)
        } else {
            self.emit(CircuitBreakerEvent::PermissionNotPermitted {
                name: self.name.clone(),
                state,
                timestamp: now,
            });
            Err(CallNotPermitted {
                name: self.name.clone(),
                state,
                writable_stack_trace: self.config.writable_stack_trace_enabled,
            })
        }
    }

    /// Reports that a permitted call completed successfully, with the given
    /// call duration (used for slow-call detection).
    pub fn on_success(&self, permission: Permission, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if permission.generation != inner.generation {
            return;
        }
        if inner.state == State::Disabled {
            return;
        }

        let slow = self.is_slow(duration);
        let state = inner.state;
        self.emit(CircuitBreakerEvent::SuccessRecorded {
            name: self.name.clone(),
            state,
            timestamp: self.config.clock.now(),
        });
        if slow {
            self.emit(CircuitBreakerEvent::SlowCallDetected {
                name: self.name.clone(),
                state,
                duration,
                timestamp: self.config.clock.now(),
            });
        }
        self.record_outcome(&mut inner, false, slow);
    }

    /// Reports that a permitted call completed with `error`. The configured
    /// [`crate::classifier::ErrorClassifier`] decides whether this counts
    /// toward the failure rate or is ignored entirely, then `error` is
    /// handed back wrapped in [`CircuitBreakerError::Inner`] so the caller
    /// can propagate it unchanged -- the breaker never swallows a caller's
    /// error, it only records its outcome.
    ///
    /// A classifier that panics is treated the same as one that returns
    /// `Ignored`: the panic is caught so it cannot poison the breaker's
    /// internal lock, the outcome is not recorded, and the panic is logged
    /// via the event channel.
    pub fn on_error(&self, permission: Permission, duration: Duration, error: E) -> CircuitBreakerError<E>
    where
        E: std::fmt::Debug,
    {
        let mut inner = self.inner.lock().unwrap();
        let recording = permission.generation == inner.generation && inner.state != State::Disabled;

        if recording {
            let state = inner.state;
            let classification = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.config.error_classifier.classify(&error)
            }));

            match classification {
                Ok(CallOutcome::Ignored) => {
                    self.emit(CircuitBreakerEvent::IgnoredErrorRecorded {
                        name: self.name.clone(),
                        state,
                        timestamp: self.config.clock.now(),
                    });
                }
                Ok(CallOutcome::Failed) => {
                    let slow = self.is_slow(duration);
                    self.emit(CircuitBreakerEvent::FailureRecorded {
                        name: self.name.clone(),
                        state,
                        timestamp: self.config.clock.now(),
                    });
                    if slow {
                        self.emit(CircuitBreakerEvent::SlowCallDetected {
                            name: self.name.clone(),
                            state,
                            duration,
                            timestamp: self.config.clock.now(),
                        });
                    }
                    self.record_outcome(&mut inner, true, slow);
                }
                Err(panic_payload) => {
                    self.log_classifier_panic(panic_payload.as_ref());
                    self.emit(CircuitBreakerEvent::IgnoredErrorRecorded {
                        name: self.name.clone(),
                        state,
                        timestamp: self.config.clock.now(),
                    });
                }
            }
        }

        drop(inner);
        CircuitBreakerError::Inner(error)
    }

    #[cfg(feature = "tracing")]
    fn log_classifier_panic(&self, panic_payload: &(dyn std::any::Any + Send)) {
        let panic_message = panic_payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic_payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        tracing::warn!(
            breaker = %self.name,
            panic_message = %panic_message,
            "error classifier panicked; outcome treated as not recorded"
        );
    }

    #[cfg(not(feature = "tracing"))]
    fn log_classifier_panic(&self, _panic_payload: &(dyn std::any::Any + Send)) {}

    /// Returns a previously acquired permission without reporting an
    /// outcome. Intended for callers who acquire a permission but decide,
    /// before invoking the guarded operation, not to proceed.
    pub fn release_permission(&self, permission: Permission) {
        let mut inner = self.inner.lock().unwrap();
        if permission.generation != inner.generation {
            return;
        }
        if inner.state == State::HalfOpen && inner.half_open_permits_issued > 0 {
            inner.half_open_permits_issued -= 1;
        }
    }

    /// Forces the breaker closed, clearing the window. Idempotent.
    pub fn transition_to_closed(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.transition_to(&mut inner, State::Closed);
    }

    /// Forces the breaker open, clearing the window. Idempotent.
    pub fn transition_to_open(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.transition_to(&mut inner, State::Open);
    }

    /// Forces the breaker into the half-open trial state. Idempotent.
    pub fn transition_to_half_open(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.transition_to(&mut inner, State::HalfOpen);
    }

    /// Disables the breaker: every call is permitted and outcomes are not
    /// recorded. Idempotent.
    pub fn transition_to_disabled(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.transition_to(&mut inner, State::Disabled);
    }

    /// Forces the breaker open regardless of call history, overriding
    /// normal recovery. Idempotent.
    pub fn transition_to_forced_open(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.transition_to(&mut inner, State::ForcedOpen);
    }

    /// Resets the breaker to `Closed` with a clean window. Equivalent to
    /// `transition_to_closed`.
    pub fn reset(&self) {
        self.transition_to_closed();
    }

    fn is_slow(&self, duration: Duration) -> bool {
        self.config
            .slow_call_duration_threshold
            .is_some_and(|threshold| duration >= threshold)
    }

    fn record_outcome(&self, inner: &mut Inner, failed: bool, slow: bool) {
        inner.window.record(failed, slow);
        match inner.state {
            State::Closed => self.evaluate_closed(inner),
            State::HalfOpen => {
                inner.half_open_completed += 1;
                self.evaluate_half_open(inner);
            }
            State::Open | State::Disabled | State::ForcedOpen => {}
        }
    }

    fn evaluate_closed(&self, inner: &mut Inner) {
        let snapshot = inner.window.snapshot();
        let failure_trip = snapshot
            .failure_rate_percent()
            .is_some_and(|rate| rate as f64 >= self.config.failure_rate_threshold);
        let slow_trip = snapshot
            .slow_call_rate_percent()
            .is_some_and(|rate| rate as f64 >= self.config.slow_call_rate_threshold);
        if failure_trip || slow_trip {
            self.transition_to(inner, State::Open);
        }
    }

    fn evaluate_half_open(&self, inner: &mut Inner) {
        if inner.half_open_completed < self.config.permitted_calls_in_half_open {
            return;
        }
        let snapshot = inner.window.snapshot();
        let total = snapshot.total_calls();
        let (failure_rate, slow_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                (snapshot.failed_calls() as f64 / total as f64) * 100.0,
                (snapshot.slow_calls() as f64 / total as f64) * 100.0,
            )
        };
        if failure_rate >= self.config.failure_rate_threshold
            || slow_rate >= self.config.slow_call_rate_threshold
        {
            self.transition_to(inner, State::Open);
        } else {
            self.transition_to(inner, State::Closed);
        }
    }

    /// Performs the transition if `target` differs from the current state.
    /// Called with the lock already held; always leaves a consistent
    /// `Inner` and publishes the new packed state word.
    fn transition_to(&self, inner: &mut Inner, target: State) {
        if inner.state == target {
            return;
        }
        let from = inner.state;
        inner.state = target;
        inner.generation += 1;
        inner.window.reset();
        inner.half_open_permits_issued = 0;
        inner.half_open_completed = 0;
        inner.opened_at = if target == State::Open {
            Some(self.config.clock.now())
        } else {
            None
        };
        self.state_word
            .store(pack(inner.generation, inner.state), Ordering::Release);

        self.emit(CircuitBreakerEvent::StateTransition {
            name: self.name.clone(),
            from_state: from,
            to_state: target,
            generation: inner.generation,
            timestamp: self.config.clock.now(),
        });
        self.emit(CircuitBreakerEvent::Reset {
            name: self.name.clone(),
            timestamp: self.config.clock.now(),
        });
    }

    fn emit(&self, event: CircuitBreakerEvent) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            breaker = %self.name,
            event = event.event_type(),
            "circuit breaker event"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = event.event_type();

        self.config.event_listeners.emit(&event);
    }
}
