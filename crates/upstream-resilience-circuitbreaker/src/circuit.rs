use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::time::Instant;

/// State of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed = 0,
    /// Calls are rejected until the reset timeout has passed.
    Open = 1,
    /// Trial calls are admitted to probe recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    pub state: CircuitState,
    /// Consecutive failures since the last success.
    pub failure_count: usize,
    /// Trial calls currently in flight (half-open only).
    pub half_open_calls: usize,
    pub time_since_last_failure: Option<Duration>,
    pub time_since_state_change: Duration,
}

/// Result of asking the circuit for permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Run the call. `probe` marks a half-open trial slot that must be
    /// released if the call is abandoned.
    Permitted { generation: u64, probe: bool },
    Rejected,
}

pub(crate) struct Circuit {
    state: CircuitState,
    failure_count: usize,
    last_failure_at: Option<Instant>,
    last_state_change: Instant,
    half_open_calls: usize,
    // Bumped on every transition so stale probe releases are ignored.
    generation: u64,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            last_state_change: Instant::now(),
            half_open_calls: 0,
            generation: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            failure_count: self.failure_count,
            half_open_calls: self.half_open_calls,
            time_since_last_failure: self.last_failure_at.map(|at| at.elapsed()),
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Open -> HalfOpen happens here, on the first check after the cooldown.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig, target: &str) -> Admission {
        let admission = match self.state {
            CircuitState::Closed => Admission::Permitted {
                generation: self.generation,
                probe: false,
            },
            CircuitState::Open => {
                if self.cooldown_elapsed(config) {
                    self.transition_to(CircuitState::HalfOpen, config, target);
                    self.admit_probe(config)
                } else {
                    Admission::Rejected
                }
            }
            CircuitState::HalfOpen => self.admit_probe(config),
        };

        match admission {
            Admission::Permitted { .. } => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallPermitted {
                        target: target.to_string(),
                        timestamp: std::time::Instant::now(),
                        state: self.state,
                    });
            }
            Admission::Rejected => {
                config
                    .event_listeners
                    .emit(&CircuitBreakerEvent::CallRejected {
                        target: target.to_string(),
                        timestamp: std::time::Instant::now(),
                    });

                #[cfg(feature = "tracing")]
                tracing::debug!(target_key = %target, state = ?self.state, "circuit breaker rejected call");

                #[cfg(feature = "metrics")]
                counter!("upstream_circuit_rejected_total", "target" => target.to_string())
                    .increment(1);
            }
        }

        admission
    }

    fn admit_probe(&mut self, config: &CircuitBreakerConfig) -> Admission {
        if self.half_open_calls < config.permitted_calls_in_half_open {
            self.half_open_calls += 1;
            Admission::Permitted {
                generation: self.generation,
                probe: true,
            }
        } else {
            Admission::Rejected
        }
    }

    fn cooldown_elapsed(&self, config: &CircuitBreakerConfig) -> bool {
        let since = match self.last_failure_at {
            Some(failed_at) if failed_at > self.last_state_change => failed_at,
            _ => self.last_state_change,
        };
        since.elapsed() >= config.reset_timeout
    }

    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig, target: &str) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                target: target.to_string(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("upstream_circuit_calls_total", "target" => target.to_string(), "outcome" => "success")
            .increment(1);

        self.failure_count = 0;
        self.transition_to(CircuitState::Closed, config, target);
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig, target: &str) {
        let previous = self.state;
        self.failure_count += 1;
        self.last_failure_at = Some(Instant::now());

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                target: target.to_string(),
                timestamp: std::time::Instant::now(),
                state: previous,
                failure_count: self.failure_count,
            });

        #[cfg(feature = "metrics")]
        counter!("upstream_circuit_calls_total", "target" => target.to_string(), "outcome" => "failure")
            .increment(1);

        match previous {
            // A failed trial reopens immediately.
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config, target),
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.transition_to(CircuitState::Open, config, target)
            }
            _ => {}
        }
    }

    /// Frees a trial slot whose call never reported an outcome.
    pub(crate) fn release_probe(&mut self, generation: u64) {
        if self.generation == generation && self.state == CircuitState::HalfOpen {
            self.half_open_calls = self.half_open_calls.saturating_sub(1);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig, target: &str) {
        self.transition_to(CircuitState::Open, config, target);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig, target: &str) {
        self.transition_to(CircuitState::Closed, config, target);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig, target: &str) {
        self.transition_to(CircuitState::Closed, config, target);
        self.failure_count = 0;
        self.last_failure_at = None;
    }

    fn transition_to(&mut self, to: CircuitState, config: &CircuitBreakerConfig, target: &str) {
        if self.state == to {
            return;
        }
        let from = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                target: target.to_string(),
                timestamp: std::time::Instant::now(),
                from_state: from,
                to_state: to,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            target_key = %target,
            from = from.as_str(),
            to = to.as_str(),
            failures = self.failure_count,
            "circuit breaker state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "upstream_circuit_transitions_total",
                "target" => target.to_string(),
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
            gauge!("upstream_circuit_state", "target" => target.to_string()).set(to as u8 as f64);
        }

        self.state = to;
        self.generation = self.generation.wrapping_add(1);
        self.last_state_change = Instant::now();
        self.half_open_calls = 0;
        if to == CircuitState::Closed {
            self.failure_count = 0;
        }
    }
}
