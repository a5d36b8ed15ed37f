//! HTTP session against the system under test
//!
//! One blocking `reqwest` client is reused for the whole run so cookies,
//! default headers and pooled connections carry across calls.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, Url};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::fixtures::AuthToken;

/// A request relative to the API root
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Authorize with a token obtained earlier in the run
    pub fn auth(self, token: &AuthToken) -> Self {
        self.bearer(token.value())
    }

    /// Authorize with an arbitrary bearer string
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("authorized", &self.bearer.is_some())
            .field("body", &self.body)
            .finish()
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.path.trim_start_matches('/'))
    }
}

/// Status and raw body of a completed call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(&self) -> ProbeResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Value at a JSON pointer such as `/course/id`
    pub fn pointer(&self, pointer: &str) -> Option<Value> {
        self.json().ok()?.pointer(pointer).cloned()
    }

    /// Non-empty string or number at a JSON pointer, as text.
    /// Servers disagree on whether ids are strings or integers.
    pub fn string_at(&self, pointer: &str) -> Option<String> {
        match self.pointer(pointer)? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn number_at(&self, pointer: &str) -> Option<f64> {
        match self.pointer(pointer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn has(&self, pointer: &str) -> bool {
        matches!(self.pointer(pointer), Some(v) if !v.is_null())
    }

    /// Leading `max` characters of the body, for failure records
    pub fn excerpt(&self, max: usize) -> String {
        truncate(&self.body, max)
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Long-lived client bound to the API root
pub struct Session {
    client: Client,
    base: Url,
}

impl Session {
    pub fn new(config: &ProbeConfig) -> ProbeResult<Self> {
        let api_base = config.api_base();
        let base = Url::parse(&api_base).map_err(|e| ProbeError::InvalidUrl {
            url: api_base.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("lmsprobe/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve an API path (leading slash optional) against the API root
    pub fn url(&self, path: &str) -> ProbeResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ProbeError::InvalidUrl {
                url: format!("{}{}", self.base, path),
                reason: e.to_string(),
            })
    }

    /// Perform a call against an already resolved URL
    pub fn execute(&self, url: Url, request: &ApiRequest) -> ProbeResult<ApiResponse> {
        debug!("→ {} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        debug!("← {} ({} bytes)", status, body.len());
        Ok(ApiResponse { status, body })
    }

    pub fn send(&self, request: &ApiRequest) -> ProbeResult<ApiResponse> {
        let url = self.url(&request.path)?;
        self.execute(url, request)
    }

    /// Poll `GET /health` until it answers 2xx or the timeout elapses
    pub fn wait_until_healthy(&self, timeout: Duration) -> ProbeResult<()> {
        let health = ApiRequest::get("health");
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match self.send(&health) {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    info!("Server is healthy at {}", self.base);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status);
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server at {}...", self.base);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            std::thread::sleep(Duration::from_millis(250));
        }

        Err(ProbeError::ServerHealthCheck(attempts))
    }
}
