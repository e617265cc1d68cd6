use std::time::{Duration, Instant};
use upstream_resilience_core::UpstreamEvent;

/// Events emitted while an attempt sequence runs.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is scheduled after `delay`. `attempt` is 1 for the first retry.
    Retry {
        client: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The sequence ended with an outcome that was not retried further.
    Success {
        client: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Retries ran out while the outcome was still retryable.
    Exhausted {
        client: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The attempt failed with an error that is never retried.
    NotRetryable {
        client: String,
        timestamp: Instant,
    },
}

impl UpstreamEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NotRetryable { .. } => "not_retryable",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NotRetryable { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retry { client, .. }
            | RetryEvent::Success { client, .. }
            | RetryEvent::Exhausted { client, .. }
            | RetryEvent::NotRetryable { client, .. } => client,
        }
    }
}
