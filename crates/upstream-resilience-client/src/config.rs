use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use upstream_resilience_circuitbreaker::BreakerRegistry;
use upstream_resilience_core::{EventListener, EventListeners, FnListener};
use upstream_resilience_retry::{RetryEvent, RetryPolicy};

/// Per-attempt timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) name: String,
    pub(crate) base_url: Option<String>,
    pub(crate) default_headers: HeaderMap,
    pub(crate) timeout: Duration,
    pub(crate) retry: RetryPolicy,
    pub(crate) registry: Arc<BreakerRegistry>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Name used in logs, events and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfigBuilder::new().build()
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    name: String,
    base_url: Option<String>,
    default_headers: HeaderMap,
    timeout: Duration,
    retry: RetryPolicy,
    registry: Option<Arc<BreakerRegistry>>,
    event_listeners: EventListeners<RetryEvent>,
}

impl ClientConfigBuilder {
    /// Defaults: no base URL, no headers, 10s timeout, 3 retries starting
    /// at 1s, the process-wide breaker registry.
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            registry: None,
            event_listeners: EventListeners::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Prefix for relative call targets.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent with every request, replacing any earlier value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.default_headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.retry = self.retry.with_max_retries(max_retries);
        self
    }

    /// Base delay, doubled for each further retry.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_retry_delay(delay);
        self
    }

    /// Status codes that trigger a retry.
    pub fn retry_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retry = self.retry.with_retry_on(codes);
        self
    }

    /// Replaces the whole retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Uses `registry` instead of the process-wide one.
    pub fn breaker_registry(mut self, registry: Arc<BreakerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Called with `(attempt, delay)` before each retry sleep.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Called with the total attempt count when retries run out.
    pub fn on_retry_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Exhausted { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    pub fn build(self) -> ClientConfig {
        ClientConfig {
            name: self.name,
            base_url: self.base_url,
            default_headers: self.default_headers,
            timeout: self.timeout,
            retry: self.retry,
            registry: self.registry.unwrap_or_else(BreakerRegistry::global),
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call overrides of the client defaults.
///
/// Headers set here replace default headers of the same name.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) max_retries: Option<usize>,
    pub(crate) retry_delay: Option<Duration>,
    pub(crate) retry_on: Option<Vec<u16>>,
    pub(crate) headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn retry_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retry_on = Some(codes.into_iter().collect());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The retry policy for one call: `base` with these overrides applied.
    pub(crate) fn apply_retry(&self, base: &RetryPolicy) -> RetryPolicy {
        let mut policy = base.clone();
        if let Some(max_retries) = self.max_retries {
            policy = policy.with_max_retries(max_retries);
        }
        if let Some(delay) = self.retry_delay {
            policy = policy.with_retry_delay(delay);
        }
        if let Some(codes) = &self.retry_on {
            policy = policy.with_retry_on(codes.iter().copied());
        }
        policy
    }
}
