//! Circuit breaker metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use upstream_resilience_circuitbreaker::{BreakerRegistry, CircuitBreakerConfig};

#[tokio::test(start_paused = true)]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let registry = BreakerRegistry::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(2)
            .reset_timeout(Duration::from_secs(1))
            .build(),
    );
    let breaker = registry.get_or_create("metrics.test");

    let _ = breaker.execute(|| async { Ok::<(), &str>(()) }).await;
    let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
    let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
    let _ = breaker.execute(|| async { Ok::<(), &str>(()) }).await;

    assert_counter_exists("upstream_circuit_calls_total");
    assert_metric_has_label("upstream_circuit_calls_total", "target", "metrics.test");
    assert_metric_has_label("upstream_circuit_calls_total", "outcome", "success");
    assert_metric_has_label("upstream_circuit_calls_total", "outcome", "failure");

    assert_counter_exists("upstream_circuit_transitions_total");
    assert_metric_has_label("upstream_circuit_transitions_total", "from", "closed");
    assert_metric_has_label("upstream_circuit_transitions_total", "to", "open");

    assert_gauge_exists("upstream_circuit_state");
    assert_metric_has_label("upstream_circuit_state", "target", "metrics.test");

    assert_counter_exists("upstream_circuit_rejected_total");
    assert_metric_has_label("upstream_circuit_rejected_total", "target", "metrics.test");
}

#[tokio::test]
#[serial]
async fn new_breaker_reports_closed_state() {
    init_recorder();

    let registry = BreakerRegistry::new(CircuitBreakerConfig::default());
    registry.get_or_create("fresh.test");

    assert_gauge_exists("upstream_circuit_state");
    assert_metric_has_label("upstream_circuit_state", "target", "fresh.test");
}
