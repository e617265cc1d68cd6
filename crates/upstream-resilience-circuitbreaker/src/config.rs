use crate::events::CircuitBreakerEvent;
use crate::CircuitState;
use std::time::Duration;
use upstream_resilience_core::{EventListener, EventListeners, FnListener};

/// Settings shared by every breaker created from one registry.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Consecutive failures that open a closed breaker.
    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    /// How long an open breaker waits after its last failure before admitting a trial call.
    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    pub fn permitted_calls_in_half_open(&self) -> usize {
        self.permitted_calls_in_half_open
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().build()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: usize,
    reset_timeout: Duration,
    permitted_calls_in_half_open: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Defaults: 5 failures, 60 second reset timeout, 1 trial call.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            permitted_calls_in_half_open: 1,
            event_listeners: EventListeners::new(),
        }
    }

    /// Consecutive failures required to open the breaker. Zero is treated as one.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n.max(1);
        self
    }

    /// Cooldown measured from the most recent failure.
    ///
    /// Default: 60 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Concurrent trial calls admitted while half-open. Zero is treated as one.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n.max(1);
        self
    }

    /// Registers an arbitrary listener.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Called with `(target, from, to)` whenever a breaker changes state.
    ///
    /// ```rust
    /// use upstream_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitState};
    ///
    /// let config = CircuitBreakerConfig::builder()
    ///     .on_state_transition(|target, from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("{target} is failing ({from:?} -> {to:?})");
    ///         }
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    target,
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(target, *from_state, *to_state);
                }
            }));
        self
    }

    /// Called with the target key whenever a call is short-circuited.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallRejected { target, .. } = event {
                    f(target);
                }
            }));
        self
    }

    /// Called with `(target, failure_count)` for every recorded failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded {
                    target,
                    failure_count,
                    ..
                } = event
                {
                    f(target, *failure_count);
                }
            }));
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            event_listeners: self.event_listeners,
        }
    }
}
