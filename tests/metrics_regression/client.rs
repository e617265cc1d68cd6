//! Client metrics regression tests

use super::helpers::*;
use futures::future::{Ready, ready};
use http::StatusCode;
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use upstream_resilience_circuitbreaker::{BreakerRegistry, CircuitBreakerConfig};
use upstream_resilience_client::{
    Client, HttpRequest, HttpResponse, RequestOptions, TransportError,
};

/// Answers 503 for the first `failures` calls, then 200.
#[derive(Clone)]
struct Flaky {
    calls: Arc<AtomicUsize>,
    failures: usize,
}

impl Service<HttpRequest> for Flaky {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = Ready<Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: HttpRequest) -> Self::Future {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let status = if n < self.failures {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };
        ready(Ok(HttpResponse::new(status)))
    }
}

#[tokio::test(start_paused = true)]
#[serial]
async fn client_metrics_exist() {
    init_recorder();

    let client = Client::builder()
        .name("metrics_client")
        .base_url("http://client-metrics.test")
        .max_retries(1)
        .retry_delay(Duration::from_millis(10))
        .breaker_registry(Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default())))
        .build(Flaky {
            calls: Arc::new(AtomicUsize::new(0)),
            failures: 3,
        });

    // 503, 503: exhausted after one retry
    let _ = client.get("/a", RequestOptions::new()).await;
    // 503, 200: one retry then success
    let _ = client.get("/b", RequestOptions::new()).await;

    assert_counter_exists("upstream_retry_attempts_total");
    assert_metric_has_label("upstream_retry_attempts_total", "client", "metrics_client");

    assert_counter_exists("upstream_retry_exhausted_total");
    assert_metric_has_label("upstream_retry_exhausted_total", "client", "metrics_client");

    assert_histogram_exists("upstream_request_duration_seconds");
    assert_metric_has_label(
        "upstream_request_duration_seconds",
        "client",
        "metrics_client",
    );
}
