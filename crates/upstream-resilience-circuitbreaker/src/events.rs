use crate::CircuitState;
use std::time::Instant;
use upstream_resilience_core::UpstreamEvent;

/// Events emitted by a circuit breaker. `target` is the breaker's key.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was let through.
    CallPermitted {
        target: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected without running.
    CallRejected { target: String, timestamp: Instant },
    /// The breaker changed state.
    StateTransition {
        target: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call completed successfully. `state` is the state before recording.
    SuccessRecorded {
        target: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call failed. `state` is the state before recording.
    FailureRecorded {
        target: String,
        timestamp: Instant,
        state: CircuitState,
        failure_count: usize,
    },
}

impl UpstreamEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { target, .. }
            | CircuitBreakerEvent::CallRejected { target, .. }
            | CircuitBreakerEvent::StateTransition { target, .. }
            | CircuitBreakerEvent::SuccessRecorded { target, .. }
            | CircuitBreakerEvent::FailureRecorded { target, .. } => target,
        }
    }
}
