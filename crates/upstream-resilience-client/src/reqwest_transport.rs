//! Transport backed by [`reqwest`].

use crate::transport::{HttpRequest, HttpResponse, TransportError};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::Service;

/// Sends [`HttpRequest`]s with a shared `reqwest::Client`.
///
/// Only the round trip happens here. Leave the reqwest client without its own
/// timeout so the executor's per-attempt timeout stays authoritative.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<HttpRequest> for ReqwestTransport {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client
                .request(request.method, request.url.as_str())
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(classify)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(classify)?;

            let mut out = HttpResponse::new(status).with_body(body);
            for (name, value) in headers.iter() {
                out = out.with_header(name.clone(), value.clone());
            }
            Ok(out)
        })
    }
}

/// Only a request that could not be built (or a redirect policy refusal) is
/// permanent. Every other failure after the request left is a network fault.
fn classify(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    let base = if err.is_timeout() {
        TransportError::timed_out(message)
    } else if err.is_connect() {
        TransportError::connect(message)
    } else if err.is_builder() || err.is_redirect() || err.is_status() {
        TransportError::other(message)
    } else {
        TransportError::connection_reset(message)
    };
    base.with_source(err)
}
