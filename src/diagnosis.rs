//! Error diagnosis for failed requests
//!
//! Turns a failed exchange into a short description, a likely cause and any
//! structured validation errors the server sent back.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::models::ApiResponse;

/// Where the target lives, as far as the URL tells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    Local,
    Remote,
}

/// One field of an RFC 7807 / ValidationProblemDetails `errors` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub error: String,
    pub likely_cause: &'static str,
    pub locality: Locality,
    pub validation_errors: Vec<FieldViolation>,
    /// Server payload, pretty-printed when it was JSON
    pub payload: String,
}

impl Diagnosis {
    pub fn is_validation_error(&self) -> bool {
        !self.validation_errors.is_empty()
    }
}

/// `Status <code>: <text>` for non-2xx responses, `None` otherwise
pub fn describe_error(response: &ApiResponse) -> Option<String> {
    if response.is_success() {
        return None;
    }
    Some(format!("Status {}: {}", response.status, response.status_text))
}

/// Diagnose a failure from its error text, target URL and whatever body came back
pub fn diagnose(error: &str, url: &str, response_data: Option<&JsonValue>) -> Diagnosis {
    let parsed = response_data.and_then(structured_body);
    let validation_errors = parsed.as_ref().map(validation_errors).unwrap_or_default();

    let payload = match (&parsed, response_data) {
        (Some(value), _) => serde_json::to_string_pretty(value).unwrap_or_default(),
        (None, Some(JsonValue::String(s))) => s.clone(),
        (None, Some(JsonValue::Null)) | (None, None) => String::new(),
        (None, Some(other)) => other.to_string(),
    };

    Diagnosis {
        error: error.to_string(),
        likely_cause: likely_cause(error, !validation_errors.is_empty()),
        locality: locality(url),
        validation_errors,
        payload,
    }
}

/// The body as a JSON object or array, parsing string bodies that open with `{`
fn structured_body(data: &JsonValue) -> Option<JsonValue> {
    match data {
        JsonValue::Object(_) | JsonValue::Array(_) => Some(data.clone()),
        JsonValue::String(s) if s.trim_start().starts_with('{') => serde_json::from_str(s).ok(),
        _ => None,
    }
}

fn validation_errors(body: &JsonValue) -> Vec<FieldViolation> {
    let Some(errors) = body.get("errors").and_then(JsonValue::as_object) else {
        return Vec::new();
    };
    errors
        .iter()
        .map(|(field, messages)| FieldViolation {
            field: field.clone(),
            messages: match messages {
                JsonValue::Array(items) => items.iter().map(message_text).collect(),
                other => vec![message_text(other)],
            },
        })
        .collect()
}

fn message_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn likely_cause(error: &str, has_validation_errors: bool) -> &'static str {
    let lower = error.to_lowercase();
    if has_validation_errors {
        "Server received the request but the payload failed validation rules."
    } else if lower.contains("fetch") || lower.contains("cors") {
        "CORS Policy Block: The server is not allowing requests from this origin."
    } else if error.contains("400") {
        "Bad Request: The server couldn't understand the request or it violated business logic."
    } else if error.contains("401") {
        "Unauthorized: Missing or invalid authentication credentials."
    } else if error.contains("403") {
        "Forbidden: You don't have permission to access this resource."
    } else if error.contains("404") {
        "Not Found: The endpoint URL does not exist on the server."
    } else if error.contains("500") {
        "Internal Server Error: The server crashed or encountered an unhandled exception."
    } else {
        "Server rejected connection or is offline."
    }
}

pub fn locality(url: &str) -> Locality {
    if url.contains("localhost") || url.contains("127.0.0.1") {
        Locality::Local
    } else {
        Locality::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response(status: u16, text: &str) -> ApiResponse {
        ApiResponse {
            status,
            status_text: text.to_string(),
            data: JsonValue::Null,
            headers: BTreeMap::new(),
            time: 0,
            size: 0,
        }
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(describe_error(&response(200, "OK")), None);
        assert_eq!(describe_error(&response(404, "Not Found")).as_deref(), Some("Status 404: Not Found"));
    }

    #[test]
    fn test_validation_errors_from_string_body() {
        let body = json!(r#"{"title":"One or more validation errors occurred.","errors":{"Name":["Required","Too short"],"Age":"Out of range"}}"#);
        let d = diagnose("Status 400: Bad Request", "https://api.x/users", Some(&body));
        assert!(d.is_validation_error());
        assert_eq!(d.likely_cause, "Server received the request but the payload failed validation rules.");
        assert_eq!(d.validation_errors[0].field, "Name");
        assert_eq!(d.validation_errors[0].messages, vec!["Required", "Too short"]);
        assert_eq!(d.validation_errors[1].messages, vec!["Out of range"]);
        assert!(d.payload.contains("\n"));
    }

    #[test]
    fn test_likely_cause_by_status() {
        assert!(likely_cause("Status 401: Unauthorized", false).starts_with("Unauthorized"));
        assert!(likely_cause("Status 403: Forbidden", false).starts_with("Forbidden"));
        assert!(likely_cause("Status 404: Not Found", false).starts_with("Not Found"));
        assert!(likely_cause("Status 500: Internal Server Error", false).starts_with("Internal Server Error"));
        assert!(likely_cause("Failed to fetch", false).starts_with("CORS"));
        assert_eq!(likely_cause("Timeout after 3.0 seconds", false), "Server rejected connection or is offline.");
    }

    #[test]
    fn test_locality_and_plain_payload() {
        let d = diagnose("Status 502: Bad Gateway", "http://localhost:5000/api", Some(&json!("upstream down")));
        assert_eq!(d.locality, Locality::Local);
        assert_eq!(d.payload, "upstream down");
        assert!(!d.is_validation_error());
        assert_eq!(locality("https://example.com"), Locality::Remote);
    }
}
