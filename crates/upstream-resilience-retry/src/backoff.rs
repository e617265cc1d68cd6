use std::fmt;
use std::time::Duration;

/// Computes the wait before a retry.
pub trait Backoff: Send + Sync + fmt::Debug {
    /// Delay before retry number `retry_index`, where 0 is the first retry.
    fn delay(&self, retry_index: usize) -> Duration;
}

/// `base * multiplier^retry_index`, saturating at [`Duration::MAX`].
///
/// No ceiling is applied; the number of retries is what bounds the total wait.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    multiplier: u32,
}

impl ExponentialBackoff {
    /// Doubling backoff starting at `base`.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            multiplier: 2,
        }
    }

    /// Replaces the growth factor. Values below 1 are treated as 1.
    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, retry_index: usize) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        u32::try_from(retry_index)
            .ok()
            .and_then(|exp| self.multiplier.checked_pow(exp))
            .map(|factor| self.base.saturating_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// The same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for FixedBackoff {
    fn delay(&self, _retry_index: usize) -> Duration {
        self.delay
    }
}

/// Backoff computed by a closure.
pub struct FnBackoff<F> {
    f: F,
}

impl<F> FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnBackoff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnBackoff")
    }
}

impl<F> Backoff for FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay(&self, retry_index: usize) -> Duration {
        (self.f)(retry_index)
    }
}
