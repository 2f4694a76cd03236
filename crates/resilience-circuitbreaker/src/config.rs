use crate::classifier::{DefaultClassifier, ErrorClassifier};
use crate::clock::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::events::CircuitBreakerEvent;
use resilience_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Type of sliding window used for tracking calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidingWindowType {
    /// Count-based window tracks the last N calls.
    CountBased,
    /// Time-based window tracks calls within a time duration, split into
    /// `sliding_window_size` buckets.
    TimeBased,
}

/// Validated configuration for a [`crate::CircuitBreaker`].
///
/// Construct one via [`CircuitBreakerConfig::builder`]; the builder performs
/// all validation and returns a [`ConfigError`] rather than panicking on an
/// invalid value.
pub struct CircuitBreakerConfig<E> {
    pub(crate) name: String,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) sliding_window_type: SlidingWindowType,
    pub(crate) sliding_window_size: usize,
    pub(crate) sliding_window_duration: Option<Duration>,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) error_classifier: Arc<dyn ErrorClassifier<E>>,
    pub(crate) slow_call_duration_threshold: Option<Duration>,
    pub(crate) slow_call_rate_threshold: f64,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) writable_stack_trace_enabled: bool,
}

impl<E> CircuitBreakerConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder<E> {
        CircuitBreakerConfigBuilder::new()
    }

    /// The name given to this configuration.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<E> {
    name: String,
    failure_rate_threshold: f64,
    sliding_window_type: SlidingWindowType,
    sliding_window_size: usize,
    sliding_window_duration: Option<Duration>,
    wait_duration_in_open: Duration,
    permitted_calls_in_half_open: usize,
    error_classifier: Arc<dyn ErrorClassifier<E>>,
    minimum_number_of_calls: Option<usize>,
    slow_call_duration_threshold: Option<Duration>,
    slow_call_rate_threshold: f64,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    clock: Arc<dyn Clock>,
    writable_stack_trace_enabled: bool,
}

impl<E: 'static> CircuitBreakerConfigBuilder<E> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            failure_rate_threshold: 50.0,
            sliding_window_type: SlidingWindowType::CountBased,
            sliding_window_size: 100,
            sliding_window_duration: None,
            wait_duration_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: 10,
            error_classifier: Arc::new(DefaultClassifier),
            minimum_number_of_calls: None,
            slow_call_duration_threshold: Some(Duration::from_secs(60)),
            slow_call_rate_threshold: 100.0,
            event_listeners: EventListeners::new(),
            clock: Arc::new(SystemClock),
            writable_stack_trace_enabled: true,
        }
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Sets the failure rate percentage (0.0-100.0) at which the circuit
    /// transitions to open.
    ///
    /// Default: 50.0
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.failure_rate_threshold = percent;
        self
    }

    /// Sets the type of sliding window to use.
    ///
    /// Default: `CountBased`
    pub fn sliding_window_type(mut self, window_type: SlidingWindowType) -> Self {
        self.sliding_window_type = window_type;
        self
    }

    /// Sets the size of the sliding window.
    ///
    /// For count-based windows this is the number of calls tracked. For
    /// time-based windows this is the number of buckets the configured
    /// duration is split into.
    ///
    /// Default: 100
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets the duration covered by a time-based sliding window.
    ///
    /// Required when `sliding_window_type` is `TimeBased`.
    pub fn sliding_window_duration(mut self, duration: Duration) -> Self {
        self.sliding_window_duration = Some(duration);
        self
    }

    /// Sets the duration the circuit remains open before transitioning to
    /// half-open.
    ///
    /// Default: 60 seconds
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open = duration;
        self
    }

    /// Sets the number of permitted calls while half-open.
    ///
    /// For a count-based window, this must not exceed `sliding_window_size`:
    /// `build()` rejects the combination, since a smaller window would evict
    /// half-open trial outcomes before all of them are counted.
    ///
    /// Default: 10
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n;
        self
    }

    /// Sets a custom error classifier.
    ///
    /// Default: every error counts as a failure.
    pub fn error_classifier<C>(mut self, classifier: C) -> Self
    where
        C: ErrorClassifier<E> + 'static,
    {
        self.error_classifier = Arc::new(classifier);
        self
    }

    /// Sets the minimum number of calls evaluated before a rate is
    /// considered meaningful rather than UNKNOWN.
    ///
    /// Default: same as `sliding_window_size`.
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = Some(n);
        self
    }

    /// Sets the duration threshold above which a call is considered slow.
    ///
    /// Default: 60 seconds. The default `slow_call_rate_threshold` of
    /// 100.0 means slow calls are tracked but never trip the breaker on
    /// their own until that threshold is lowered.
    pub fn slow_call_duration_threshold(mut self, duration: Duration) -> Self {
        self.slow_call_duration_threshold = Some(duration);
        self
    }

    /// Sets the slow-call rate percentage (0.0-100.0) at which the circuit
    /// transitions to open. Only meaningful once
    /// `slow_call_duration_threshold` is set.
    ///
    /// Default: 100.0 (effectively disabled)
    pub fn slow_call_rate_threshold(mut self, percent: f64) -> Self {
        self.slow_call_rate_threshold = percent;
        self
    }

    /// Supplies a custom time source. Intended for tests that need to
    /// assert open-state expiry without sleeping.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Controls whether `CallNotPermitted` is advertised as carrying a
    /// meaningful backtrace. This has no effect on behavior; it exists so
    /// callers can signal intent to downstream error-reporting layers.
    ///
    /// Default: `true`
    pub fn writable_stack_trace_enabled(mut self, enabled: bool) -> Self {
        self.writable_stack_trace_enabled = enabled;
        self
    }

    /// Registers a callback invoked whenever the circuit changes state.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State, crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is permitted.
    pub fn on_permission_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::PermissionAcquired { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is rejected.
    pub fn on_permission_not_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::PermissionNotPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a success is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a counted failure is recorded.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when an error is classified as ignored.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::State) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::IgnoredErrorRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call exceeds the slow-call
    /// duration threshold.
    pub fn on_slow_call<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SlowCallDetected { duration, .. } = event {
                    f(*duration);
                }
            }));
        self
    }

    /// Validates the accumulated settings and builds the configuration.
    pub fn build(self) -> Result<CircuitBreakerConfig<E>, ConfigError> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err(ConfigError::InvalidArgument {
                field: "failure_rate_threshold",
                reason: "must be greater than 0.0 and at most 100.0".to_string(),
            });
        }
        if !(self.slow_call_rate_threshold > 0.0 && self.slow_call_rate_threshold <= 100.0) {
            return Err(ConfigError::InvalidArgument {
                field: "slow_call_rate_threshold",
                reason: "must be greater than 0.0 and at most 100.0".to_string(),
            });
        }
        if self.wait_duration_in_open < Duration::from_millis(1) {
            return Err(ConfigError::InvalidArgument {
                field: "wait_duration_in_open",
                reason: "must be at least 1 millisecond".to_string(),
            });
        }
        if let Some(threshold) = self.slow_call_duration_threshold {
            if threshold < Duration::from_nanos(1) {
                return Err(ConfigError::InvalidArgument {
                    field: "slow_call_duration_threshold",
                    reason: "must be at least 1 nanosecond".to_string(),
                });
            }
        }
        if self.sliding_window_size == 0 {
            return Err(ConfigError::InvalidArgument {
                field: "sliding_window_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(ConfigError::InvalidArgument {
                field: "permitted_calls_in_half_open",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sliding_window_type == SlidingWindowType::CountBased
            && self.permitted_calls_in_half_open > self.sliding_window_size
        {
            return Err(ConfigError::InvalidArgument {
                field: "permitted_calls_in_half_open",
                reason:
                    "must not exceed sliding_window_size for a count-based window, or the window \
                     evicts half-open trial calls before all of them are counted, skewing the \
                     half-open failure/slow rate"
                        .to_string(),
            });
        }
        if self.sliding_window_type == SlidingWindowType::TimeBased
            && self.sliding_window_duration.is_none()
        {
            return Err(ConfigError::InvalidArgument {
                field: "sliding_window_duration",
                reason: "must be set when sliding_window_type is TimeBased".to_string(),
            });
        }

        let minimum_number_of_calls = self
            .minimum_number_of_calls
            .unwrap_or(self.sliding_window_size);
        if minimum_number_of_calls == 0 {
            return Err(ConfigError::InvalidArgument {
                field: "minimum_number_of_calls",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(CircuitBreakerConfig {
            name: self.name,
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_type: self.sliding_window_type,
            sliding_window_size: self.sliding_window_size,
            sliding_window_duration: self.sliding_window_duration,
            wait_duration_in_open: self.wait_duration_in_open,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            error_classifier: self.error_classifier,
            minimum_number_of_calls,
            slow_call_duration_threshold: self.slow_call_duration_threshold,
            slow_call_rate_threshold: self.slow_call_rate_threshold,
            event_listeners: self.event_listeners,
            clock: self.clock,
            writable_stack_trace_enabled: self.writable_stack_trace_enabled,
        })
    }
}

impl<E: 'static> Default for CircuitBreakerConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
