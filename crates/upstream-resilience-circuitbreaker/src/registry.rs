use crate::{CircuitBreaker, CircuitBreakerConfig, CircuitMetrics};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Lazily created breakers, one per target key.
///
/// Entries are never evicted: the map grows with the number of distinct hosts
/// contacted and lives as long as the registry.
pub struct BreakerRegistry {
    config: Arc<CircuitBreakerConfig>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

static GLOBAL: OnceLock<Arc<BreakerRegistry>> = OnceLock::new();

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry with default breaker settings.
    pub fn global() -> Arc<BreakerRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(BreakerRegistry::default())))
    }

    /// Returns the breaker for `target`, creating it on first use.
    ///
    /// Concurrent first calls for the same key all receive the same breaker.
    pub fn get_or_create(&self, target: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.get(target) {
            return breaker;
        }

        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let breaker = breakers.entry(target.to_string()).or_insert_with(|| {
            #[cfg(feature = "tracing")]
            tracing::debug!(target_key = %target, "created circuit breaker");

            #[cfg(feature = "metrics")]
            metrics::gauge!("upstream_circuit_state", "target" => target.to_string()).set(0.0);

            Arc::new(CircuitBreaker::new(target, Arc::clone(&self.config)))
        });
        Arc::clone(breaker)
    }

    /// Returns the breaker for `target` if one has been created.
    pub fn get(&self, target: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Known target keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Metrics for every breaker, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, CircuitMetrics)> {
        let breakers: Vec<Arc<CircuitBreaker>> = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut snapshot: Vec<_> = breakers
            .iter()
            .map(|breaker| (breaker.target().to_string(), breaker.metrics()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl std::fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("breakers", &self.len())
            .finish()
    }
}
