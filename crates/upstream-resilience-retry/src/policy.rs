use crate::backoff::{Backoff, ExponentialBackoff};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Statuses retried when no explicit retry set is configured.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// What a single attempt produced, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The exchange completed with this status code.
    Status(u16),
    /// The per-attempt timeout fired before a response arrived.
    TimedOut,
    /// A low-level network failure worth trying again (refused, reset).
    Transient,
    /// A failure that will not improve by retrying.
    Permanent,
}

/// The policy's answer for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then try again.
    Retry { delay: Duration },
    /// The outcome is not retryable; hand it back as is.
    Done,
    /// The outcome is retryable but the retry budget is spent.
    Exhausted,
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Retry bound, retryable statuses and backoff for one attempt sequence.
///
/// Cheap to clone; per-call overrides are applied with the `with_*` methods.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Arc<dyn Backoff>,
    retry_on: Arc<BTreeSet<u16>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::new().build()
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Decides what to do after an attempt.
    ///
    /// `retries_so_far` counts the retries already performed, so it is 0
    /// after the initial attempt. The returned delay for a retry uses it as
    /// the backoff index.
    pub fn decide(&self, outcome: &AttemptOutcome, retries_so_far: usize) -> RetryDecision {
        if !self.is_retryable(outcome) {
            return RetryDecision::Done;
        }
        if retries_so_far >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry {
            delay: self.backoff.delay(retries_so_far),
        }
    }

    /// Returns true if `outcome` would be retried given remaining budget.
    pub fn is_retryable(&self, outcome: &AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::Status(code) => self.retry_on.contains(code),
            AttemptOutcome::TimedOut | AttemptOutcome::Transient => true,
            AttemptOutcome::Permanent => false,
        }
    }

    /// Delay before retry number `retry_index` (0 is the first retry).
    pub fn delay_for(&self, retry_index: usize) -> Duration {
        self.backoff.delay(retry_index)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Retryable status codes in ascending order.
    pub fn retryable_status_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.retry_on.iter().copied()
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Switches to doubling backoff starting at `base`.
    pub fn with_retry_delay(mut self, base: Duration) -> Self {
        self.backoff = Arc::new(ExponentialBackoff::new(base));
        self
    }

    /// Replaces the retryable status set.
    pub fn with_retry_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retry_on = Arc::new(codes.into_iter().collect());
        self
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: usize,
    backoff: Option<Arc<dyn Backoff>>,
    retry_delay: Duration,
    retry_on: BTreeSet<u16>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicyBuilder {
    /// Defaults:
    /// - max_retries: 3
    /// - retry_delay: 1 second, doubled per retry
    /// - retry_on: 408, 429, 500, 502, 503, 504
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff: None,
            retry_delay: Duration::from_secs(1),
            retry_on: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }

    /// Retries allowed after the initial attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay for doubling backoff. Ignored when [`backoff`](Self::backoff) is set.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Uses a custom backoff instead of doubling from `retry_delay`.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Replaces the retryable status set.
    pub fn retry_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retry_on = codes.into_iter().collect();
        self
    }

    pub fn build(self) -> RetryPolicy {
        let backoff = self
            .backoff
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(self.retry_delay)));
        RetryPolicy {
            max_retries: self.max_retries,
            backoff,
            retry_on: Arc::new(self.retry_on),
        }
    }
}
