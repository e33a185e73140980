//! Low-level request dispatch.
//!
//! [`RequestDispatcher`] resolves an endpoint key against the
//! [`EndpointRegistry`], builds the query string, issues one GET with a
//! per-call timeout, classifies the outcome, and records statistics on the
//! registry entry. It never panics and never returns a Rust error: every
//! failure mode is a [`CallFailure`] inside the returned [`CallResult`].
//!
//! | Outcome | Kind | Status |
//! |---------|------|--------|
//! | unknown key | `EndpointNotFound` | none |
//! | disabled endpoint | `EndpointDisabled` | none |
//! | non-2xx response | `Http` | response code |
//! | 2xx with malformed JSON | `Decode` | none |
//! | timeout elapsed | `Timeout` | none |
//! | other transport error | `Transport` | none |

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn, Instrument};
use url::form_urlencoded;
use uuid::Uuid;

use crate::call_result::{CallErrorKind, CallFailure, CallResult, CallSuccess};
use crate::config::DEFAULT_TIMEOUT_MS;
use crate::endpoint::{EndpointDescriptor, EndpointRegistry};
use crate::http_client::{HttpClient, HttpRequest};
use crate::UtcDateTime;

const TRANSPORT_FALLBACK_MESSAGE: &str = "Network request failed";

/// Scalar query parameter value. `Null` parameters are omitted from the URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl QueryValue {
    fn to_query_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Per-call options. Query parameters keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    pub query: Vec<(String, QueryValue)>,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            query: Vec::new(),
            headers: BTreeMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Appends form-encoded query parameters to `base`, skipping null values.
///
/// ```
/// use coinsight_core::dispatcher::{build_url, QueryValue};
///
/// let url = build_url(
///     "https://x/d?existing=1",
///     &[
///         (String::from("page"), QueryValue::from(1)),
///         (String::from("limit"), QueryValue::Null),
///     ],
/// );
/// assert_eq!(url, "https://x/d?existing=1&page=1");
/// ```
pub fn build_url(base: &str, params: &[(String, QueryValue)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut appended = false;
    for (name, value) in params {
        if let Some(value) = value.to_query_string() {
            serializer.append_pair(name, &value);
            appended = true;
        }
    }

    if !appended {
        return base.to_owned();
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{}", serializer.finish())
}

/// Joins `suffix` onto `base` with exactly one `/` between them.
pub fn join_path(base: &str, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches('/');
    if suffix.is_empty() {
        return base.to_owned();
    }
    format!("{}/{suffix}", base.trim_end_matches('/'))
}

/// Issues registry-resolved GET requests and records call statistics.
#[derive(Clone)]
pub struct RequestDispatcher {
    registry: Arc<dyn EndpointRegistry>,
    http_client: Arc<dyn HttpClient>,
}

impl RequestDispatcher {
    pub fn new(registry: Arc<dyn EndpointRegistry>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            registry,
            http_client,
        }
    }

    pub fn registry(&self) -> &Arc<dyn EndpointRegistry> {
        &self.registry
    }

    pub async fn dispatch<T>(&self, endpoint_key: &str, options: &CallOptions) -> CallResult<T>
    where
        T: DeserializeOwned,
    {
        let endpoint = self.resolve(endpoint_key)?;
        let url = build_url(&endpoint.url, &options.query);
        self.send(endpoint_key, url, options).await
    }

    /// Dispatches against `<endpoint url>/<path_suffix>`.
    ///
    /// The suffixed URL is handed straight to the transport; the registry
    /// entry itself is never rewritten, so concurrent callers of the same key
    /// always observe the stored URL.
    pub async fn dispatch_with_path_suffix<T>(
        &self,
        endpoint_key: &str,
        path_suffix: &str,
        options: &CallOptions,
    ) -> CallResult<T>
    where
        T: DeserializeOwned,
    {
        let endpoint = self.resolve(endpoint_key)?;
        let base = join_path(&endpoint.url, path_suffix);
        let url = build_url(&base, &options.query);
        self.send(endpoint_key, url, options).await
    }

    fn resolve(&self, endpoint_key: &str) -> Result<EndpointDescriptor, CallFailure> {
        let Some(endpoint) = self.registry.endpoint(endpoint_key) else {
            error!(endpoint = endpoint_key, "endpoint not found in registry");
            return Err(CallFailure::endpoint_not_found(endpoint_key));
        };

        if !endpoint.enabled {
            warn!(endpoint = endpoint_key, "endpoint is disabled; call skipped");
            return Err(CallFailure::endpoint_disabled(endpoint_key));
        }

        Ok(endpoint)
    }

    async fn send<T>(&self, endpoint_key: &str, url: String, options: &CallOptions) -> CallResult<T>
    where
        T: DeserializeOwned,
    {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("dispatch", endpoint = endpoint_key, %request_id);

        async move {
            self.registry.record_attempt(endpoint_key, UtcDateTime::now());

            let mut request = HttpRequest::get(url)
                .with_header("Content-Type", "application/json")
                .with_timeout_ms(options.timeout_ms);
            for (name, value) in &options.headers {
                request = request.with_header(name.as_str(), value.as_str());
            }

            debug!(url = %request.url, timeout_ms = options.timeout_ms, "dispatching request");
            let started = Instant::now();
            // Dropping the transport future on expiry cancels the in-flight request.
            let outcome = tokio::time::timeout(
                Duration::from_millis(options.timeout_ms),
                self.http_client.execute(request),
            )
            .await;
            let elapsed_ms = elapsed_ms(started);

            let failure = match outcome {
                Err(_) => CallFailure::timeout(endpoint_key, options.timeout_ms),
                Ok(Err(transport)) if transport.is_timeout() => {
                    CallFailure::timeout(endpoint_key, options.timeout_ms)
                }
                Ok(Err(transport)) => {
                    debug!(kind = ?transport.kind(), "transport error");
                    let message = if transport.message().trim().is_empty() {
                        TRANSPORT_FALLBACK_MESSAGE
                    } else {
                        transport.message()
                    };
                    CallFailure::new(CallErrorKind::Transport, message)
                }
                Ok(Ok(response)) if !response.is_success() => {
                    CallFailure::http(response.status, &response.status_text, &response.body)
                }
                Ok(Ok(response)) => match serde_json::from_str::<T>(&response.body) {
                    Ok(data) => {
                        debug!(status = response.status, elapsed_ms, "request succeeded");
                        return Ok(CallSuccess::new(data, Some(response.status)));
                    }
                    // A 2xx with an undecodable body reports no status, like a transport failure.
                    Err(decode) => CallFailure::new(CallErrorKind::Decode, decode.to_string()),
                },
            };

            self.registry.record_error(endpoint_key, failure.message());
            error!(
                endpoint = endpoint_key,
                code = failure.code(),
                status = failure.status(),
                elapsed_ms,
                error = failure.message(),
                "API call failed"
            );
            Err(failure)
        }
        .instrument(span)
        .await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
