//! Core request/response data types
//!
//! These mirror the persisted workbench format, so field names serialize in
//! camelCase.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::http::HttpMethod;

/// Generate a fresh identifier for headers, requests and history entries
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// A header row in the request editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(default = "generate_id")]
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Parse a `Name: value` header line
    pub fn parse_line(line: &str) -> Option<Self> {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, value.trim()))
    }

    /// Only enabled rows with both a name and a value are sent
    pub fn is_active(&self) -> bool {
        self.enabled && !self.key.is_empty() && !self.value.is_empty()
    }
}

/// A request as edited in the workbench (templates unresolved)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "now_millis")]
    pub created_at: i64,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: String::new(),
            url: url.into(),
            method,
            headers: Vec::new(),
            body: String::new(),
            created_at: now_millis(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry::new(key, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Headers that will actually be sent
    pub fn active_headers(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.headers.iter().filter(|h| h.is_active())
    }
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Normalized result of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    /// Parsed JSON, or a string when the body was not JSON
    pub data: JsonValue,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Elapsed wall-clock time in milliseconds
    pub time: u64,
    /// Length of the re-serialized `data`
    pub size: usize,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A sent request with its response, newest first in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub request: ApiRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ApiResponse>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_active_rules() {
        let mut h = HeaderEntry::new("Accept", "application/json");
        assert!(h.is_active());
        h.enabled = false;
        assert!(!h.is_active());
        assert!(!HeaderEntry::new("", "x").is_active());
        assert!(!HeaderEntry::new("X-Empty", "").is_active());
    }

    #[test]
    fn test_parse_header_line() {
        let h = HeaderEntry::parse_line("Authorization: Bearer a:b").unwrap();
        assert_eq!(h.key, "Authorization");
        assert_eq!(h.value, "Bearer a:b");
        assert!(HeaderEntry::parse_line(": value").is_none());
        assert!(HeaderEntry::parse_line("no-colon").is_none());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = ApiRequest::new(HttpMethod::Post, "https://x.test").with_body("{}");
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["method"], "POST");
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: ApiRequest = serde_json::from_str(r#"{"url":"https://x.test","method":"GET"}"#).unwrap();
        assert!(req.headers.is_empty());
        assert!(!req.id.is_empty());
    }
}
