//! Retry decisions for outbound HTTP calls.
//!
//! A [`RetryPolicy`] is a pure decision function. Given the outcome of one
//! attempt and how many retries have already happened, it answers whether the
//! caller should try again and how long to wait first. It never sleeps or
//! performs I/O itself; the request executor owns the attempt loop.
//!
//! Outcomes are retryable when the response status is in the policy's retry
//! set (408, 429, 500, 502, 503 and 504 by default) or when the attempt failed
//! with a transient network error or timed out. Every other outcome is handed
//! back to the caller unchanged.
//!
//! ```
//! use upstream_resilience_retry::{AttemptOutcome, RetryDecision, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .retry_delay(Duration::from_millis(250))
//!     .build();
//!
//! assert_eq!(
//!     policy.decide(&AttemptOutcome::Status(503), 0),
//!     RetryDecision::Retry { delay: Duration::from_millis(250) }
//! );
//! assert_eq!(
//!     policy.decide(&AttemptOutcome::Status(503), 1),
//!     RetryDecision::Retry { delay: Duration::from_millis(500) }
//! );
//! assert_eq!(policy.decide(&AttemptOutcome::Status(503), 3), RetryDecision::Exhausted);
//! assert_eq!(policy.decide(&AttemptOutcome::Status(404), 0), RetryDecision::Done);
//! ```

mod backoff;
mod events;
mod policy;

pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff, FnBackoff};
pub use events::RetryEvent;
pub use policy::{
    AttemptOutcome, DEFAULT_RETRYABLE_STATUS_CODES, RetryDecision, RetryPolicy,
    RetryPolicyBuilder,
};
