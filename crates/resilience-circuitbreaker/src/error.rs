use crate::circuit::State;
use thiserror::Error;

/// Returned by [`crate::CircuitBreaker::acquire_permission`] when a call is
/// not allowed through.
#[derive(Debug, Clone, Error)]
#[error("circuit breaker '{name}' did not permit the call (state: {state:?})")]
pub struct CallNotPermitted {
    pub(crate) name: String,
    pub(crate) state: State,
    pub(crate) writable_stack_trace: bool,
}

impl CallNotPermitted {
    /// The name of the circuit breaker that rejected the call.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state the circuit breaker was in when it rejected the call.
    pub fn state(&self) -> State {
        self.state
    }

    /// Mirrors the breaker's `writable_stack_trace_enabled` config flag.
    ///
    /// This has no effect on this error's own behavior -- Rust has no
    /// platform-specific stack-trace-capture toggle to hook into -- it is
    /// advisory payload a caller's own error-reporting layer can read to
    /// decide whether to capture a backtrace around the call site.
    pub fn writable_stack_trace(&self) -> bool {
        self.writable_stack_trace
    }
}

/// The error a decorator built on top of [`crate::CircuitBreaker`] returns
/// from a guarded call: either the call was never permitted, or it was
/// permitted and the caller's own operation failed.
///
/// [`crate::CircuitBreaker::on_error`] returns this so the caller can
/// propagate the original error unchanged after it has been recorded --
/// the breaker records the outcome but never swallows the error itself.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E: std::fmt::Debug> {
    /// The call was rejected by [`crate::CircuitBreaker::acquire_permission`].
    #[error(transparent)]
    CallNotPermitted(#[from] CallNotPermitted),

    /// The call was permitted and completed with the caller's own error.
    #[error("call failed: {0:?}")]
    Inner(E),
}

/// Errors produced while building a [`crate::CircuitBreakerConfig`].
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A configuration field was given a value outside its valid range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },

    /// A named configuration was looked up but never registered.
    #[error("no circuit breaker configuration registered for '{name}'")]
    ConfigurationNotFound { name: String },
}
