use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;
use upstream_resilience_retry::AttemptOutcome;

/// Why a logical call produced no response.
///
/// Completed exchanges are never errors, whatever their status; inspect
/// [`HttpResponse::status`](crate::HttpResponse::status) for those.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The breaker for this target is open; nothing was sent.
    #[error("circuit breaker is open for {target}")]
    CircuitOpen { target: String },

    /// The last attempt did not complete within the per-attempt timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The last attempt failed below HTTP.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request body could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Body(#[source] serde_json::Error),
}

impl RequestError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, RequestError::CircuitOpen { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }

    /// Timeouts and transient transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            RequestError::Timeout { .. } => true,
            RequestError::Transport(err) => err.is_transient(),
            RequestError::CircuitOpen { .. } | RequestError::Body(_) => false,
        }
    }

    pub(crate) fn outcome(&self) -> AttemptOutcome {
        match self {
            RequestError::Timeout { .. } => AttemptOutcome::TimedOut,
            RequestError::Transport(err) if err.is_transient() => AttemptOutcome::Transient,
            _ => AttemptOutcome::Permanent,
        }
    }
}
