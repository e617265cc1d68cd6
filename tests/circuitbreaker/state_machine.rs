use super::{breaker, fail, succeed};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use upstream_resilience_circuitbreaker::{BreakerRegistry, CircuitBreakerConfig, CircuitState};

#[tokio::test]
async fn fresh_breaker_stays_closed_on_success() {
    let breaker = breaker(5, Duration::from_secs(60));

    assert!(succeed(&breaker).await);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn opens_at_threshold_and_short_circuits() {
    let breaker = breaker(5, Duration::from_secs(60));
    let calls = AtomicUsize::new(0);

    for i in 1..=5 {
        let _ = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("refused")
            })
            .await;
        let expected = if i < 5 {
            CircuitState::Closed
        } else {
            CircuitState::Open
        };
        assert_eq!(breaker.state(), expected, "after failure {i}");
    }

    let err = breaker
        .execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), &str>(())
        })
        .await
        .unwrap_err();

    assert!(err.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn success_resets_consecutive_count() {
    let breaker = breaker(3, Duration::from_secs(60));

    fail(&breaker).await;
    fail(&breaker).await;
    assert_eq!(breaker.failure_count(), 2);

    assert!(succeed(&breaker).await);
    assert_eq!(breaker.failure_count(), 0);

    fail(&breaker).await;
    fail(&breaker).await;
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn inner_error_is_returned_after_recording() {
    let breaker = breaker(1, Duration::from_secs(60));

    let err = breaker
        .execute(|| async { Err::<(), _>("connection refused") })
        .await
        .unwrap_err();

    assert!(!err.is_circuit_open());
    assert_eq!(err.into_inner(), Some("connection refused"));
    assert!(breaker.is_open());
}

#[tokio::test(start_paused = true)]
async fn rejects_until_reset_timeout_elapses() {
    let breaker = breaker(2, Duration::from_secs(60));
    fail(&breaker).await;
    fail(&breaker).await;

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(!succeed(&breaker).await);
    assert!(breaker.is_open());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(succeed(&breaker).await);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn open_state_is_only_left_on_inspection() {
    let breaker = breaker(1, Duration::from_secs(10));
    fail(&breaker).await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    assert!(succeed(&breaker).await);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn transitions_are_reported() {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&transitions);
    let registry = BreakerRegistry::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .reset_timeout(Duration::from_secs(5))
            .on_state_transition(move |target, from, to| {
                t.lock().unwrap().push((target.to_string(), from, to));
            })
            .build(),
    );
    let breaker = registry.get_or_create("svc.test");

    fail(&breaker).await;
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(succeed(&breaker).await);

    let transitions = transitions.lock().unwrap();
    assert_eq!(
        *transitions,
        vec![
            ("svc.test".to_string(), CircuitState::Closed, CircuitState::Open),
            ("svc.test".to_string(), CircuitState::Open, CircuitState::HalfOpen),
            ("svc.test".to_string(), CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test]
async fn rejections_are_reported() {
    let rejected = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&rejected);
    let registry = BreakerRegistry::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .on_call_rejected(move |target| {
                assert_eq!(target, "svc.test");
                r.fetch_add(1, Ordering::SeqCst);
            })
            .build(),
    );
    let breaker = registry.get_or_create("svc.test");

    fail(&breaker).await;
    for _ in 0..3 {
        assert!(!succeed(&breaker).await);
    }
    assert_eq!(rejected.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn metrics_snapshot_tracks_failures() {
    let breaker = breaker(3, Duration::from_secs(60));
    assert_eq!(breaker.metrics().time_since_last_failure, None);

    fail(&breaker).await;
    tokio::time::advance(Duration::from_secs(2)).await;

    let metrics = breaker.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.failure_count, 1);
    assert_eq!(metrics.time_since_last_failure, Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn listeners_see_every_event_in_order() {
    use upstream_resilience_circuitbreaker::CircuitBreakerEvent;
    use upstream_resilience_core::{FnListener, UpstreamEvent};

    let events = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&events);
    let registry = BreakerRegistry::new(
        CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .listener(FnListener::new(move |event: &CircuitBreakerEvent| {
                assert_eq!(event.source(), "svc.test");
                e.lock().unwrap().push(event.event_type());
            }))
            .build(),
    );
    let breaker = registry.get_or_create("svc.test");

    assert!(succeed(&breaker).await);
    fail(&breaker).await;
    assert!(!succeed(&breaker).await);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "call_permitted",
            "success_recorded",
            "call_permitted",
            "failure_recorded",
            "state_transition",
            "call_rejected",
        ]
    );
}
