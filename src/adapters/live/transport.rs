use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::adapters::live::retry::parse_retry_after;
use crate::error::{ProviderError, Result};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// One HTTP exchange to issue against the provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest<'a> {
    pub method: Method,
    /// Path segments below the base URL; each one is percent-encoded.
    pub segments: Vec<&'a str>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<&'a Value>,
    pub idempotency_key: Option<&'a str>,
}

impl<'a> ProviderRequest<'a> {
    pub fn new(method: Method, segments: Vec<&'a str>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn json(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: Option<&'a str>) -> Self {
        self.idempotency_key = key;
        self
    }
}

/// What came back, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    /// Parsed JSON; `Null` for an empty body, a JSON string for non-JSON text.
    pub body: Value,
}

/// Bearer-authenticated JSON transport rooted at the provider base URL.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Config(format!(
                "provider base URL '{base_url}' cannot carry a path"
            )));
        }
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("No provider API key configured, requests are sent unauthenticated");
        }

        Ok(Self {
            http,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Config(format!("base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform one exchange. Network failures surface as transient errors
    /// and per-attempt timeouts as `Timeout`; any HTTP status is returned.
    pub async fn send(&self, request: &ProviderRequest<'_>) -> Result<RawResponse> {
        let mut url = self.endpoint(&request.segments)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        debug!(method = %request.method, url = %url, "Provider HTTP request");

        let mut builder = self
            .http
            .request(request.method.clone(), url.as_str())
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(key) = request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.network_error(&e))?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let text = response.text().await.map_err(|e| self.network_error(&e))?;
        debug!(status, body_len = text.len(), "Provider HTTP response");
        trace!(status, body = %text, "Provider raw response");

        Ok(RawResponse {
            status,
            retry_after,
            body: parse_body(&text),
        })
    }

    fn network_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout {
                after: self.timeout,
            }
        } else {
            ProviderError::Transient {
                status: None,
                body: Value::Null,
                message: error.to_string(),
            }
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
