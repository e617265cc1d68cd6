//! Per-host circuit breakers for outbound HTTP calls.
//!
//! A breaker counts consecutive failed calls against one target key
//! (normally the request authority, `host[:port]`). Once the count reaches the
//! configured threshold the breaker opens and every call fails fast with
//! [`CircuitBreakerError::OpenCircuit`] until the reset timeout has passed since
//! the last failure. The next call after that is a trial: success closes the
//! breaker, failure reopens it.
//!
//! ## States
//! - **Closed**: calls run; failures are counted
//! - **Open**: calls are rejected without running
//! - **Half-Open**: a limited number of trial calls run to probe recovery
//!
//! A "call" is whatever future the caller hands to
//! [`execute`](CircuitBreaker::execute). The request executor passes its whole
//! retrying attempt sequence, so a request that succeeds on its third attempt
//! counts as one success rather than two failures and a success.
//!
//! ## Usage
//!
//! ```rust
//! use upstream_resilience_circuitbreaker::{BreakerRegistry, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let registry = BreakerRegistry::new(
//!     CircuitBreakerConfig::builder()
//!         .failure_threshold(5)
//!         .reset_timeout(Duration::from_secs(60))
//!         .build(),
//! );
//!
//! let breaker = registry.get_or_create("api.example.com");
//! let result = breaker
//!     .execute(|| async { Ok::<_, std::io::Error>("payload") })
//!     .await;
//!
//! assert!(result.is_ok());
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: breaker counters and state gauge via the `metrics` crate
//! - `tracing`: transition and rejection logs via the `tracing` crate
//! - `serde`: `Serialize` for `CircuitState` and `CircuitMetrics`

use crate::circuit::{Admission, Circuit};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use registry::BreakerRegistry;

mod circuit;
mod config;
mod error;
mod events;
mod registry;

/// A consecutive-failure breaker bound to one target key.
///
/// State changes happen under a per-breaker mutex that is never held across
/// an `.await`, so concurrent calls to the same host cannot lose updates.
pub struct CircuitBreaker {
    target: String,
    circuit: Mutex<Circuit>,
    state_atomic: AtomicU8,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    pub fn new(target: impl Into<String>, config: Arc<CircuitBreakerConfig>) -> Self {
        Self {
            target: target.into(),
            circuit: Mutex::new(Circuit::new()),
            state_atomic: AtomicU8::new(CircuitState::Closed as u8),
            config,
        }
    }

    /// Runs `operation` if the breaker admits it and records the outcome.
    ///
    /// When the breaker is open and still cooling down, `operation` is never
    /// called and [`CircuitBreakerError::OpenCircuit`] is returned. Otherwise
    /// `Ok` counts as a success and `Err` as a failure; the original error is
    /// returned as [`CircuitBreakerError::Inner`] after the state is updated.
    ///
    /// Dropping the returned future before it completes records nothing, but
    /// frees the half-open trial slot it may hold.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.with_circuit(|circuit| circuit.try_acquire(&self.config, &self.target));
        let Admission::Permitted { generation, probe } = admission else {
            return Err(CircuitBreakerError::OpenCircuit {
                target: self.target.clone(),
            });
        };

        let mut guard = ProbeGuard {
            breaker: self,
            generation,
            armed: probe,
        };
        let result = operation().await;
        guard.armed = false;

        match &result {
            Ok(_) => self.with_circuit(|circuit| circuit.record_success(&self.config, &self.target)),
            Err(_) => self.with_circuit(|circuit| circuit.record_failure(&self.config, &self.target)),
        }

        result.map_err(CircuitBreakerError::Inner)
    }

    /// The key this breaker guards.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Last recorded state, read without locking.
    ///
    /// An open breaker whose cooldown has elapsed still reports `Open` here;
    /// the move to `HalfOpen` happens on the next [`execute`](Self::execute).
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Consecutive failures since the last success.
    pub fn failure_count(&self) -> usize {
        self.with_circuit(|circuit| circuit.failure_count())
    }

    pub fn metrics(&self) -> CircuitMetrics {
        self.with_circuit(|circuit| circuit.metrics())
    }

    /// Opens the breaker now; the cooldown starts from this moment.
    pub fn force_open(&self) {
        self.with_circuit(|circuit| circuit.force_open(&self.config, &self.target));
    }

    /// Closes the breaker without a trial call.
    pub fn force_closed(&self) {
        self.with_circuit(|circuit| circuit.force_closed(&self.config, &self.target));
    }

    /// Closes the breaker and forgets every recorded failure.
    pub fn reset(&self) {
        self.with_circuit(|circuit| circuit.reset(&self.config, &self.target));
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn with_circuit<R>(&self, f: impl FnOnce(&mut Circuit) -> R) -> R {
        let mut circuit = self.circuit.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut circuit);
        self.state_atomic
            .store(circuit.state() as u8, Ordering::Release);
        out
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("target", &self.target)
            .field("state", &self.state())
            .finish()
    }
}

struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let generation = self.generation;
            self.breaker
                .with_circuit(|circuit| circuit.release_probe(generation));
        }
    }
}
