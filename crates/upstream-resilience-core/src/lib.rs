//! Shared infrastructure for the upstream-resilience crates.
//!
//! The circuit breaker and the retrying executor both report what they do
//! through the listener types defined here, so dashboards can log or count
//! breaker transitions and retries without depending on either crate's
//! internals.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, SharedListener, UpstreamEvent};
