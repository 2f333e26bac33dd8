//! Generic HTTP request service bound to one backend resource.
//!
//! [`SourceService`] owns a configured client and turns backend calls into
//! a uniform shape: a call either resolves to a decoded value or to
//! `None`, with any failure detail published on the error bus instead of
//! returned to the caller. Reducers stay free of HTTP error plumbing and
//! a single subscriber renders every failure the same way.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use wallflower_core::event_bus::EventBus;
use wallflower_core::storage::Storage;

use crate::config::{Operation, ServiceConfig};
use crate::error::ConfigError;

/// Storage key the service reads the session token from before each call.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Detail message published when the backend cannot be reached at all.
pub const THIRD_PARTY_SERVICE_ERROR: &str = "Third-party service error";

/// Fallback detail used when an error response carries no detail of its own.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Re-runs a failed request once; resolves to `true` when the repeat
/// attempt reaches the backend and succeeds.
pub type RetryFn = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Failure event published on the API error bus.
#[derive(Clone)]
pub struct ApiError {
    /// HTTP status code; transport failures are reported as `500`.
    pub status: u16,
    /// Human-readable detail, server-supplied or synthesized.
    pub details: String,
    /// Present when the originating call opted into retry.
    pub retry: Option<RetryFn>,
}

impl ApiError {
    /// A non-retryable error with the given status and detail.
    #[must_use]
    pub fn new(status: u16, details: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
            retry: None,
        }
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("status", &self.status)
            .field("details", &self.details)
            .field("retryable", &self.retry.is_some())
            .finish()
    }
}

/// Everything needed to (re)issue one request.
///
/// Kept owned and cloneable so a retry can replay the request later
/// without borrowing from the original call site.
#[derive(Clone)]
struct RequestParts {
    url: String,
    method: Method,
    payload: Option<Value>,
    headers: Vec<(String, String)>,
}

/// A request pipeline bound to one backend resource.
///
/// Cloning is cheap; clones share the HTTP client (and its cookie jar),
/// the storage handle, and the error bus.
///
/// # Example
///
/// ```ignore
/// let service = SourceService::new(config, storage, errors)?;
///
/// // Bound operation with payload:
/// let created: Option<Project> = service
///     .bound(Operation::Create)
///     .json(&draft)
///     .send()
///     .await;
///
/// // Free-form path:
/// let stats: Option<Stats> = service.call("stats/weekly").send().await;
/// ```
#[derive(Clone)]
pub struct SourceService<S> {
    config: ServiceConfig,
    client: Client,
    storage: S,
    events: EventBus<ApiError>,
}

impl<S> SourceService<S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    /// Build a service from a resolved configuration.
    ///
    /// The client keeps a cookie store so backend-set cookies ride along
    /// on subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ClientBuild`] when the HTTP client cannot
    /// be constructed.
    pub fn new(
        config: ServiceConfig,
        storage: S,
        events: EventBus<ApiError>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| ConfigError::ClientBuild(error.to_string()))?;

        Ok(Self {
            config,
            client,
            storage,
            events,
        })
    }

    /// Start a call to a free-form path under the service address.
    #[must_use]
    pub fn call(&self, path: impl Into<String>) -> CallBuilder<'_, S> {
        let url = format!("{}{}", self.config.base_address(), path.into());
        CallBuilder {
            service: self,
            parts: RequestParts {
                url,
                method: Method::POST,
                payload: None,
                headers: Vec::new(),
            },
            retryable: false,
        }
    }

    /// Start a call to one of the configured standard operations.
    #[must_use]
    pub fn bound(&self, operation: Operation) -> CallBuilder<'_, S> {
        self.call(self.config.bindings().path(operation))
    }

    /// The resolved configuration this service was built from.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The bus this service publishes failures on.
    #[must_use]
    pub const fn events(&self) -> &EventBus<ApiError> {
        &self.events
    }

    /// Issue the request and apply the failure taxonomy.
    ///
    /// Returns the response only for 2xx statuses. Every other outcome
    /// resolves to `None`:
    ///
    /// - elapsed deadline: dropped silently (only a debug log)
    /// - other transport failure: published as a synthetic `500`
    /// - non-2xx status: published with the server's detail when present
    async fn dispatch(
        &self,
        parts: &RequestParts,
        retry: Option<RetryFn>,
    ) -> Option<reqwest::Response> {
        let request = self.assemble(parts);

        match request.send().await {
            Err(error) if error.is_timeout() => {
                debug!(url = %parts.url, "request deadline elapsed");
                None
            }
            Err(error) => {
                debug!(url = %parts.url, %error, "transport failure");
                self.events.publish(ApiError {
                    status: 500,
                    details: THIRD_PARTY_SERVICE_ERROR.to_owned(),
                    retry,
                });
                None
            }
            Ok(response) if !response.status().is_success() => {
                let status = response.status().as_u16();
                let details = read_error_detail(response).await;
                debug!(url = %parts.url, status, "request rejected");
                self.events.publish(ApiError {
                    status,
                    details,
                    retry,
                });
                None
            }
            Ok(response) => Some(response),
        }
    }

    /// Assemble the request: headers, token, payload, timeout.
    ///
    /// Header precedence, lowest to highest: the JSON content type,
    /// caller-supplied headers, the session token. Later entries replace
    /// earlier ones of the same name.
    fn assemble(&self, parts: &RequestParts) -> reqwest::RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &parts.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "dropping header with invalid name or value"),
            }
        }

        // The token is read from storage per call, so a login that just
        // landed is picked up without rebuilding the service.
        let token: Option<String> = self.storage.load(TOKEN_STORAGE_KEY);
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(TOKEN_STORAGE_KEY), value);
                }
                Err(_) => warn!("stored session token is not a valid header value"),
            }
        }

        let mut request = self
            .client
            .request(parts.method.clone(), parts.url.as_str())
            .headers(headers)
            .timeout(self.config.timeout());

        if let Some(payload) = &parts.payload {
            request = request.json(payload);
        }

        request
    }
}

impl<S> fmt::Debug for SourceService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Extract the `detail` field from an error response body.
///
/// Bodies that are missing, unparsable, or carry a blank detail all fall
/// back to [`UNEXPECTED_ERROR`].
async fn read_error_detail(response: reqwest::Response) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        detail: Option<String>,
    }

    match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            detail: Some(detail),
        }) if !detail.trim().is_empty() => detail,
        _ => UNEXPECTED_ERROR.to_owned(),
    }
}

/// Builder for a single call on a [`SourceService`].
///
/// Defaults: `POST`, no payload, no extra headers, not retryable.
pub struct CallBuilder<'a, S> {
    service: &'a SourceService<S>,
    parts: RequestParts,
    retryable: bool,
}

impl<S> CallBuilder<'_, S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    /// Override the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.parts.method = method;
        self
    }

    /// Attach a JSON payload.
    ///
    /// A payload that fails to serialize is dropped with a warning and
    /// the call proceeds without a body.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => self.parts.payload = Some(value),
            Err(error) => warn!(%error, "payload failed to serialize, sending without a body"),
        }
        self
    }

    /// Add a header, overriding any default of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.headers.push((name.into(), value.into()));
        self
    }

    /// Mark the call as retryable.
    ///
    /// When a retryable call fails, the published [`ApiError`] carries a
    /// closure that replays the request once.
    #[must_use]
    pub const fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Issue the call and decode a 2xx response body.
    ///
    /// Resolves to `None` on any failure; the failure itself travels on
    /// the service's error bus. A 2xx body that fails to decode is also
    /// `None`, logged but not published: the request did succeed.
    pub async fn send<R: DeserializeOwned>(self) -> Option<R> {
        let Self {
            service,
            parts,
            retryable,
        } = self;

        let retry = retryable.then(|| make_retry(service.clone(), parts.clone()));
        let response = service.dispatch(&parts, retry).await?;

        match response.json::<R>().await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(url = %parts.url, %error, "response body failed to decode");
                None
            }
        }
    }
}

impl<S> fmt::Debug for CallBuilder<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallBuilder")
            .field("url", &self.parts.url)
            .field("method", &self.parts.method)
            .field("retryable", &self.retryable)
            .finish_non_exhaustive()
    }
}

/// Build the replay closure for a retryable call.
///
/// The replay itself is never retryable again: a second failure is
/// published without a retry handle.
fn make_retry<S>(service: SourceService<S>, parts: RequestParts) -> RetryFn
where
    S: Storage + Clone + Send + Sync + 'static,
{
    Arc::new(move || {
        let service = service.clone();
        let parts = parts.clone();
        async move { service.dispatch(&parts, None).await.is_some() }.boxed()
    })
}
