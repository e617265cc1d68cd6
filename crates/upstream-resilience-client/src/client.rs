use crate::config::{ClientConfig, ClientConfigBuilder, RequestOptions};
use crate::error::RequestError;
use crate::executor::{AttemptPolicy, RequestExecutor};
use crate::target::resolve_url;
use crate::transport::{HttpRequest, HttpResponse, TransportError};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::Service;
use upstream_resilience_circuitbreaker::BreakerRegistry;
use upstream_resilience_retry::RetryPolicy;

/// HTTP client with per-host circuit breaking, retries and per-attempt
/// timeouts.
///
/// Every verb returns `Ok` for any completed exchange, error statuses
/// included. Cloning is cheap and clones share configuration and breakers.
pub struct Client<T> {
    executor: RequestExecutor<T>,
}

impl<T: Clone> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
        }
    }
}

impl Client<()> {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T> Client<T>
where
    T: Service<HttpRequest, Response = HttpResponse, Error = TransportError>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Future: Send,
{
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            executor: RequestExecutor::new(Arc::new(config), transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.executor.config()
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    /// Resolves `target` against the configured base URL.
    pub fn resolve(&self, target: &str) -> String {
        resolve_url(self.config().base_url(), target)
    }

    /// Sends a bodyless request.
    pub async fn request(
        &self,
        method: Method,
        target: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.dispatch(method, target, None, options).await
    }

    /// Sends `body` serialized as JSON.
    ///
    /// Fails with [`RequestError::Body`] before anything is sent if `body`
    /// cannot be serialized.
    pub async fn request_json<B>(
        &self,
        method: Method,
        target: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(RequestError::Body)?;
        self.dispatch(method, target, Some(Bytes::from(body)), options)
            .await
    }

    pub async fn get(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.request(Method::GET, target, options).await
    }

    pub async fn delete(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        self.request(Method::DELETE, target, options).await
    }

    pub async fn post<B>(
        &self,
        target: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        self.request_json(Method::POST, target, body, options).await
    }

    pub async fn put<B>(
        &self,
        target: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        self.request_json(Method::PUT, target, body, options).await
    }

    pub async fn patch<B>(
        &self,
        target: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError>
    where
        B: Serialize + ?Sized,
    {
        self.request_json(Method::PATCH, target, body, options).await
    }

    /// Sends a prepared request under the client defaults.
    ///
    /// The URL is resolved against the base URL and default headers are added
    /// where the request does not set them.
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, RequestError> {
        request.url = self.resolve(&request.url);
        let own = std::mem::take(&mut request.headers);
        request.headers = merge_headers(self.config().default_headers(), &own);
        let policy = self.executor.default_policy();
        self.executor.execute(request, &policy).await
    }

    async fn dispatch(
        &self,
        method: Method,
        target: &str,
        body: Option<Bytes>,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        let config = self.config();
        let mut headers = merge_headers(config.default_headers(), &options.headers);
        if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let request = HttpRequest {
            method,
            url: self.resolve(target),
            headers,
            body,
        };
        let policy = AttemptPolicy {
            retry: options.apply_retry(config.retry_policy()),
            timeout: options.timeout.unwrap_or(config.timeout()),
        };
        self.executor.execute(request, &policy).await
    }
}

/// Defaults first, then every header named in `overrides` replaces all
/// default values of that name.
pub(crate) fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in overrides.keys() {
        merged.remove(name);
        for value in overrides.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    merged
}

/// Builder returned by [`Client::builder`].
pub struct ClientBuilder {
    config: ClientConfigBuilder,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            config: ClientConfigBuilder::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.name(name);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.base_url(base_url);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config = self.config.header(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.config = self.config.max_retries(max_retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.retry_delay(delay);
        self
    }

    pub fn retry_on<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.config = self.config.retry_on(codes);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config = self.config.retry_policy(policy);
        self
    }

    pub fn breaker_registry(mut self, registry: Arc<BreakerRegistry>) -> Self {
        self.config = self.config.breaker_registry(registry);
        self
    }

    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.config = self.config.on_retry(f);
        self
    }

    pub fn on_retry_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.config = self.config.on_retry_exhausted(f);
        self
    }

    pub fn build<T>(self, transport: T) -> Client<T>
    where
        T: Service<HttpRequest, Response = HttpResponse, Error = TransportError>
            + Clone
            + Send
            + Sync
            + 'static,
        T::Future: Send,
    {
        Client::new(self.config.build(), transport)
    }
}
