//! Resilient outbound HTTP for dashboard widgets.
//!
//! [`Client`] resolves call targets against a base URL, merges headers, and
//! hands each logical call to a [`RequestExecutor`]. The executor runs the
//! call through the circuit breaker for the target host and, inside it,
//! retries timeouts, transient network failures and retryable statuses with
//! doubling delays.
//!
//! The network itself is any cloneable [`tower::Service`] from
//! [`HttpRequest`] to [`HttpResponse`]. Enable the `reqwest` feature for a
//! ready-made [`ReqwestTransport`].
//!
//! ```rust
//! use http::StatusCode;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use upstream_resilience_circuitbreaker::{BreakerRegistry, CircuitBreakerConfig};
//! use upstream_resilience_client::{
//!     Client, HttpRequest, HttpResponse, RequestOptions, TransportError,
//! };
//!
//! # async fn example() -> Result<(), upstream_resilience_client::RequestError> {
//! let transport = tower::service_fn(|_req: HttpRequest| async {
//!     Ok::<_, TransportError>(HttpResponse::new(StatusCode::OK).with_body("{}"))
//! });
//!
//! let client = Client::builder()
//!     .name("grafana")
//!     .base_url("http://grafana.internal/api")
//!     .timeout(Duration::from_secs(5))
//!     .breaker_registry(Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default())))
//!     .build(transport);
//!
//! let response = client.get("health", RequestOptions::new()).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//! - `tracing`: retry, exhaustion and bypass logs
//! - `metrics`: retry counters and request duration histogram
//! - `reqwest`: [`ReqwestTransport`]

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, RequestOptions, DEFAULT_TIMEOUT};
pub use error::RequestError;
pub use executor::{AttemptPolicy, RequestExecutor};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use target::{has_scheme, resolve_url, target_key};
pub use transport::{HttpRequest, HttpResponse, TransportError, TransportErrorKind};

mod client;
mod config;
mod error;
mod executor;
#[cfg(feature = "reqwest")]
mod reqwest_transport;
mod target;
mod transport;
