//! The fetch-like network seam
//!
//! Everything that goes over the wire passes through [`Transport`]. The
//! production implementation wraps a shared `reqwest::Client`; tests swap in
//! an in-memory transport.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::errors::AxiomError;
use crate::http::HttpMethod;

pub const USER_AGENT_STRING: &str = concat!("Axiom/", env!("CARGO_PKG_VERSION"));

/// A fully resolved request ready for the wire
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back from a completed HTTP exchange, any status code included
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    InvalidRequest,
    Other,
}

/// The request never produced an HTTP status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("Timeout after {:.1} seconds", after.as_secs_f64()),
        )
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_builder() {
            TransportErrorKind::InvalidRequest
        } else {
            TransportErrorKind::Other
        };
        let message = match kind {
            TransportErrorKind::Timeout => "Timeout".to_string(),
            TransportErrorKind::Connect => format!("Connection failed: {}", e),
            _ => e.to_string(),
        };
        Self { kind, message }
    }
}

/// Anything that can carry an [`OutboundRequest`] to a server
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// Client settings for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whole-request timeout applied by the client
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub insecure: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            follow_redirects: true,
            max_redirects: 10,
            insecure: false,
        }
    }
}

/// [`Transport`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, AxiomError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT_STRING)
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(30));

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        if options.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(options.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        if options.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::invalid(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::invalid(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.append(header_name, header_value);
        }

        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.text().await?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: response_headers,
            body,
        })
    }
}
