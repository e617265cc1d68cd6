use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::target::target_key;
use crate::transport::{HttpRequest, HttpResponse, TransportError};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Service, ServiceExt};
use upstream_resilience_circuitbreaker::CircuitBreakerError;
use upstream_resilience_retry::{AttemptOutcome, RetryDecision, RetryEvent, RetryPolicy};

/// Retry and timeout settings for one logical call.
#[derive(Debug, Clone)]
pub struct AttemptPolicy {
    pub retry: RetryPolicy,
    /// Bound on each attempt, not on the whole sequence.
    pub timeout: Duration,
}

/// Runs one logical call: breaker admission, then up to `1 + max_retries`
/// timed attempts against the transport.
///
/// The breaker for the request's host sees the whole attempt sequence as a
/// single call. Requests whose URL has no host skip the breaker.
pub struct RequestExecutor<T> {
    transport: T,
    config: Arc<ClientConfig>,
}

impl<T: Clone> Clone for RequestExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T> RequestExecutor<T>
where
    T: Service<HttpRequest, Response = HttpResponse, Error = TransportError>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Future: Send,
{
    pub fn new(config: Arc<ClientConfig>, transport: T) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The client-wide retry policy and timeout.
    pub fn default_policy(&self) -> AttemptPolicy {
        AttemptPolicy {
            retry: self.config.retry.clone(),
            timeout: self.config.timeout,
        }
    }

    /// Executes `request` under `policy`.
    ///
    /// Every completed exchange is returned as `Ok`, including statuses that
    /// exhausted their retries. `Err` means the breaker rejected the call, or
    /// the final attempt timed out or failed in the transport.
    pub async fn execute(
        &self,
        request: HttpRequest,
        policy: &AttemptPolicy,
    ) -> Result<HttpResponse, RequestError> {
        let started = tokio::time::Instant::now();

        let result = match target_key(&request.url) {
            Some(key) => {
                let breaker = self.config.registry.get_or_create(&key);
                breaker
                    .execute(|| self.run_attempts(&request, policy))
                    .await
                    .map_err(|err| match err {
                        CircuitBreakerError::OpenCircuit { target } => {
                            RequestError::CircuitOpen { target }
                        }
                        CircuitBreakerError::Inner(err) => err,
                    })
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    client = %self.config.name,
                    url = %request.url,
                    "no host in request url, bypassing circuit breaker"
                );
                self.run_attempts(&request, policy).await
            }
        };

        #[cfg(feature = "metrics")]
        metrics::histogram!("upstream_request_duration_seconds", "client" => self.config.name.clone())
            .record(started.elapsed().as_secs_f64());
        #[cfg(not(feature = "metrics"))]
        let _ = started;

        result
    }

    async fn run_attempts(
        &self,
        request: &HttpRequest,
        policy: &AttemptPolicy,
    ) -> Result<HttpResponse, RequestError> {
        let mut retries = 0;

        loop {
            let result = self.attempt(request, policy.timeout).await;
            let outcome = match &result {
                Ok(response) => AttemptOutcome::Status(response.status().as_u16()),
                Err(err) => err.outcome(),
            };

            match policy.retry.decide(&outcome, retries) {
                RetryDecision::Retry { delay } => {
                    retries += 1;
                    self.config.event_listeners.emit(&RetryEvent::Retry {
                        client: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt: retries,
                        delay,
                    });

                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        client = %self.config.name,
                        url = %request.url,
                        attempt = retries,
                        ?delay,
                        reason = ?outcome,
                        "retrying request"
                    );

                    #[cfg(feature = "metrics")]
                    metrics::counter!("upstream_retry_attempts_total", "client" => self.config.name.clone())
                        .increment(1);

                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Done => {
                    let event = if result.is_ok() {
                        RetryEvent::Success {
                            client: self.config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: retries + 1,
                        }
                    } else {
                        RetryEvent::NotRetryable {
                            client: self.config.name.clone(),
                            timestamp: Instant::now(),
                        }
                    };
                    self.config.event_listeners.emit(&event);
                    return result;
                }
                RetryDecision::Exhausted => {
                    self.config.event_listeners.emit(&RetryEvent::Exhausted {
                        client: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: retries + 1,
                    });

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        client = %self.config.name,
                        url = %request.url,
                        attempts = retries + 1,
                        reason = ?outcome,
                        "retries exhausted"
                    );

                    #[cfg(feature = "metrics")]
                    metrics::counter!("upstream_retry_exhausted_total", "client" => self.config.name.clone())
                        .increment(1);

                    return result;
                }
            }
        }
    }

    /// One round trip bounded by `timeout`. On expiry the in-flight transport
    /// future is dropped.
    async fn attempt(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, RequestError> {
        let call = self.transport.clone().oneshot(request.clone());
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(RequestError::Transport(err)),
            Err(_) => Err(RequestError::Timeout {
                url: request.url.clone(),
                timeout,
            }),
        }
    }
}

impl<T> Service<HttpRequest> for RequestExecutor<T>
where
    T: Service<HttpRequest, Response = HttpResponse, Error = TransportError>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Future: Send,
{
    type Response = HttpResponse;
    type Error = RequestError;
    type Future = BoxFuture<'static, Result<HttpResponse, RequestError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Each attempt readies its own transport clone.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let executor = self.clone();
        Box::pin(async move {
            let policy = executor.default_policy();
            executor.execute(request, &policy).await
        })
    }
}
