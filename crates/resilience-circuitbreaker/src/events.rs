//! Events emitted by a circuit breaker as it records outcomes and
//! transitions between states.

use crate::circuit::State;
use resilience_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// An event emitted by a [`crate::CircuitBreaker`].
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was permitted to proceed.
    PermissionAcquired {
        name: String,
        state: State,
        timestamp: Instant,
    },
    /// A call was rejected because the circuit did not permit it.
    PermissionNotPermitted {
        name: String,
        state: State,
        timestamp: Instant,
    },
    /// The caller reported a successful call outcome.
    SuccessRecorded {
        name: String,
        state: State,
        timestamp: Instant,
    },
    /// The caller reported a failed call outcome that counts toward the
    /// failure rate.
    FailureRecorded {
        name: String,
        state: State,
        timestamp: Instant,
    },
    /// The caller reported an error outcome that the configured classifier
    /// chose to ignore.
    IgnoredErrorRecorded {
        name: String,
        state: State,
        timestamp: Instant,
    },
    /// A call duration exceeded the slow-call threshold.
    SlowCallDetected {
        name: String,
        state: State,
        duration: Duration,
        timestamp: Instant,
    },
    /// The circuit transitioned from one state to another.
    StateTransition {
        name: String,
        from_state: State,
        to_state: State,
        generation: u64,
        timestamp: Instant,
    },
    /// Counters and window contents were cleared, either via an explicit
    /// reset or as a side effect of a state transition.
    Reset {
        name: String,
        timestamp: Instant,
    },
}

impl CircuitBreakerEvent {
    fn name(&self) -> &str {
        match self {
            CircuitBreakerEvent::PermissionAcquired { name, .. }
            | CircuitBreakerEvent::PermissionNotPermitted { name, .. }
            | CircuitBreakerEvent::SuccessRecorded { name, .. }
            | CircuitBreakerEvent::FailureRecorded { name, .. }
            | CircuitBreakerEvent::IgnoredErrorRecorded { name, .. }
            | CircuitBreakerEvent::SlowCallDetected { name, .. }
            | CircuitBreakerEvent::StateTransition { name, .. }
            | CircuitBreakerEvent::Reset { name, .. } => name,
        }
    }
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::PermissionAcquired { .. } => "permission_acquired",
            CircuitBreakerEvent::PermissionNotPermitted { .. } => "permission_not_permitted",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
            CircuitBreakerEvent::IgnoredErrorRecorded { .. } => "ignored_error_recorded",
            CircuitBreakerEvent::SlowCallDetected { .. } => "slow_call_detected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::Reset { .. } => "reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::PermissionAcquired { timestamp, .. }
            | CircuitBreakerEvent::PermissionNotPermitted { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::IgnoredErrorRecorded { timestamp, .. }
            | CircuitBreakerEvent::SlowCallDetected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::Reset { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transition_reports_correct_metadata() {
        let event = CircuitBreakerEvent::StateTransition {
            name: "orders".to_string(),
            from_state: State::Closed,
            to_state: State::Open,
            generation: 3,
            timestamp: Instant::now(),
        };

        assert_eq!(event.event_type(), "state_transition");
        assert_eq!(event.pattern_name(), "orders");
    }

    #[test]
    fn permission_events_report_distinct_types() {
        let permitted = CircuitBreakerEvent::PermissionAcquired {
            name: "a".to_string(),
            state: State::Closed,
            timestamp: Instant::now(),
        };
        let rejected = CircuitBreakerEvent::PermissionNotPermitted {
            name: "a".to_string(),
            state: State::Open,
            timestamp: Instant::now(),
        };
        assert_ne!(permitted.event_type(), rejected.event_type());
    }
}
