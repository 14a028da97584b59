//! Single-request execution
//!
//! Resolves a workbench request against a variable set, sends it through a
//! [`Transport`], and normalizes whatever comes back into an [`ApiResponse`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use mime::Mime;
use serde_json::Value as JsonValue;

use crate::models::{ApiRequest, ApiResponse};
use crate::variables::{interpolate, Variable};
use super::transport::{OutboundRequest, RawResponse, Transport, TransportError};

/// Sends requests through a shared transport with an optional timeout
#[derive(Debug)]
pub struct Executor<T> {
    transport: Arc<T>,
    timeout: Option<Duration>,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
        }
    }
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Abort requests that have not completed within `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Send one request, resolving templates first.
    ///
    /// Non-2xx statuses come back as `Ok`; only transport failures are `Err`.
    pub async fn execute(&self, request: &ApiRequest, variables: &[Variable]) -> Result<ApiResponse, TransportError> {
        let outbound = prepare(request, variables, None);
        tracing::debug!(method = %outbound.method, url = %outbound.url, "Executing request");
        let (raw, elapsed) = self.dispatch(outbound).await?;
        Ok(normalize(raw, elapsed))
    }

    /// Send an already-resolved request and time it
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<(RawResponse, Duration), TransportError> {
        let start = Instant::now();
        let fut = self.transport.send(request);
        let raw = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| TransportError::timeout(limit))??,
            None => fut.await?,
        };
        Ok((raw, start.elapsed()))
    }
}

/// Resolve URL, active headers and body against `variables`.
///
/// The body is only attached for methods that carry one.
pub fn prepare(request: &ApiRequest, variables: &[Variable], sequence: Option<i64>) -> OutboundRequest {
    let headers = request
        .active_headers()
        .map(|h| {
            (
                interpolate(&h.key, variables, sequence),
                interpolate(&h.value, variables, sequence),
            )
        })
        .collect();
    let body = request
        .method
        .allows_body()
        .then(|| interpolate(&request.body, variables, sequence));

    OutboundRequest {
        method: request.method,
        url: interpolate(&request.url, variables, sequence),
        headers,
        body,
    }
}

/// Turn a raw exchange into the uniform response record
pub fn normalize(raw: RawResponse, elapsed: Duration) -> ApiResponse {
    let declared_json = raw.header("content-type").map(is_json_content_type).unwrap_or(false);
    let data = parse_body(&raw.body, declared_json);
    let size = serde_json::to_string(&data).map(|s| s.len()).unwrap_or(0);
    let headers = raw.headers.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();

    ApiResponse {
        status: raw.status,
        status_text: raw.status_text,
        data,
        headers,
        time: elapsed.as_millis() as u64,
        size,
    }
}

/// Parse a response body.
///
/// Declared JSON is parsed outright. Other bodies are parsed only when the
/// trimmed text opens with `{` or `[`; anything unparseable stays a string.
pub fn parse_body(body: &str, declared_json: bool) -> JsonValue {
    let trimmed = body.trim_start();
    let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with('[');
    if declared_json || looks_like_json {
        if let Ok(value) = serde_json::from_str(body) {
            return value;
        }
    }
    JsonValue::String(body.to_string())
}

/// `application/json` or any `+json` subtype
fn is_json_content_type(header: &str) -> bool {
    match header.trim().parse::<Mime>() {
        Ok(m) => m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON),
        Err(_) => header.to_ascii_lowercase().contains("application/json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/html; charset=utf-8"));
    }

    #[test]
    fn test_prepare_interpolates_everything() {
        let vars = vec![Variable::new("host", "api.test"), Variable::new("token", "t0k")];
        let mut request = ApiRequest::new(HttpMethod::Post, "https://{{host}}/items")
            .with_header("Authorization", "Bearer {{token}}")
            .with_header("X-Off", "ignored")
            .with_body(r#"{"owner":"{{token}}"}"#);
        request.headers[1].enabled = false;

        let out = prepare(&request, &vars, None);
        assert_eq!(out.url, "https://api.test/items");
        assert_eq!(out.headers, vec![("Authorization".to_string(), "Bearer t0k".to_string())]);
        assert_eq!(out.body.as_deref(), Some(r#"{"owner":"t0k"}"#));
    }

    #[test]
    fn test_prepare_omits_body_for_get_and_delete() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let request = ApiRequest::new(method, "https://x.test").with_body("{}");
            assert_eq!(prepare(&request, &[], None).body, None);
        }
        let request = ApiRequest::new(HttpMethod::Patch, "https://x.test").with_body("{}");
        assert_eq!(prepare(&request, &[], None).body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_parse_body_rules() {
        assert_eq!(parse_body(r#"{"a":1}"#, true), json!({ "a": 1 }));
        assert_eq!(parse_body("  [1,2]", false), json!([1, 2]));
        assert_eq!(parse_body("{broken", false), json!("{broken"));
        assert_eq!(parse_body("plain text", false), json!("plain text"));
        assert_eq!(parse_body("42", true), json!(42));
        assert_eq!(parse_body("", true), json!(""));
    }

    #[test]
    fn test_normalize_size_uses_reserialized_data() {
        let raw = RawResponse::new(201, "{ \"id\" :  7 }").with_header("Content-Type", "application/json");
        let response = normalize(raw, Duration::from_millis(12));
        assert_eq!(response.status, 201);
        assert_eq!(response.status_text, "Created");
        assert_eq!(response.data, json!({ "id": 7 }));
        assert_eq!(response.size, r#"{"id":7}"#.len());
        assert_eq!(response.time, 12);
        assert_eq!(response.headers.get("content-type").map(String::as_str), Some("application/json"));
    }
}
