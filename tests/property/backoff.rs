//! Property tests for retry backoff.
//!
//! Invariants tested:
//! - each delay is twice the previous one until saturation
//! - the first retry waits exactly the base delay
//! - a retryable outcome is retried exactly `max_retries` times

use proptest::prelude::*;
use std::time::Duration;
use upstream_resilience_retry::{AttemptOutcome, RetryDecision, RetryPolicy};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn delays_double(base_ms in 1u64..=5_000, index in 0usize..20) {
        let policy = RetryPolicy::builder()
            .retry_delay(Duration::from_millis(base_ms))
            .build();

        prop_assert_eq!(policy.delay_for(0), Duration::from_millis(base_ms));
        prop_assert_eq!(policy.delay_for(index + 1), policy.delay_for(index) * 2);
    }

    #[test]
    fn delays_never_decrease(base_ms in 0u64..=10_000, index in 0usize..200) {
        let policy = RetryPolicy::builder()
            .retry_delay(Duration::from_millis(base_ms))
            .build();
        prop_assert!(policy.delay_for(index + 1) >= policy.delay_for(index));
    }

    #[test]
    fn retryable_outcome_retries_exactly_max_retries(
        max_retries in 0usize..10,
        code in prop::sample::select(vec![408u16, 429, 500, 502, 503, 504]),
    ) {
        let policy = RetryPolicy::builder().max_retries(max_retries).build();
        let outcome = AttemptOutcome::Status(code);

        let mut retries = 0;
        while let RetryDecision::Retry { .. } = policy.decide(&outcome, retries) {
            retries += 1;
            prop_assert!(retries <= max_retries);
        }
        prop_assert_eq!(retries, max_retries);
        prop_assert_eq!(policy.decide(&outcome, retries), RetryDecision::Exhausted);
    }

    #[test]
    fn successful_statuses_are_never_retried(code in 200u16..300, retries in 0usize..5) {
        let policy = RetryPolicy::default();
        prop_assert_eq!(policy.decide(&AttemptOutcome::Status(code), retries), RetryDecision::Done);
    }
}
