//! Field patterns: one templated property of a batch payload

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::generate_id;
use crate::variables::SEQUENCE_TOKEN;

/// Declared scalar type of a generated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Null,
}

impl FieldType {
    /// Type of an observed JSON value; arrays and objects are treated as strings
    pub fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(_) => FieldType::Number,
            JsonValue::Bool(_) => FieldType::Boolean,
            JsonValue::Null => FieldType::Null,
            _ => FieldType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Null => "null",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "s" => Some(FieldType::String),
            "number" | "num" | "int" | "float" => Some(FieldType::Number),
            "boolean" | "bool" => Some(FieldType::Boolean),
            "null" => Some(FieldType::Null),
            _ => None,
        }
    }
}

/// One property of the batch payload template.
///
/// `id` identifies the row for reordering and plays no part in generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPattern {
    #[serde(default = "generate_id")]
    pub id: String,
    pub key: String,
    pub pattern: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

impl FieldPattern {
    pub fn new(key: impl Into<String>, pattern: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: generate_id(),
            key: key.into(),
            pattern: pattern.into(),
            field_type,
        }
    }

    /// Build a pattern from an observed field.
    ///
    /// Identifier-like names become `{{n}}`, title/name fields become a
    /// numbered label, and anything else keeps its last known value.
    pub fn derive(name: &str, value: &JsonValue) -> Self {
        let lower = name.to_lowercase();
        let pattern = if lower.contains("id") {
            SEQUENCE_TOKEN.to_string()
        } else if lower.contains("title") || lower.contains("name") {
            format!("{} {}", capitalize(name), SEQUENCE_TOKEN)
        } else {
            literal_of(value)
        };
        Self::new(name, pattern, FieldType::of(value))
    }

    /// Parse a CLI field spec: `key=pattern` with an optional `:type` suffix.
    ///
    /// The suffix is only taken as a type when it names one, so patterns
    /// containing colons (URLs, times) survive intact.
    pub fn parse_spec(spec: &str) -> Option<Self> {
        let (key, rest) = spec.split_once('=')?;
        if key.trim().is_empty() {
            return None;
        }
        if let Some((pattern, ty)) = rest.rsplit_once(':') {
            if let Some(field_type) = FieldType::parse(ty) {
                return Some(Self::new(key.trim(), pattern, field_type));
            }
        }
        Some(Self::new(key.trim(), rest, FieldType::String))
    }
}

/// Derive a full pattern set from a response payload.
///
/// Arrays contribute their first element; a primitive payload becomes a
/// single `value` field.
pub fn patterns_from_response(payload: &JsonValue) -> Vec<FieldPattern> {
    let sample = match payload {
        JsonValue::Array(items) => items.first().cloned().unwrap_or_else(|| JsonValue::Object(Default::default())),
        other => other.clone(),
    };
    match sample {
        JsonValue::Object(map) => map.iter().map(|(k, v)| FieldPattern::derive(k, v)).collect(),
        primitive => vec![FieldPattern::derive("value", &primitive)],
    }
}

fn literal_of(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derive_heuristics() {
        let id = FieldPattern::derive("userId", &json!(4));
        assert_eq!(id.pattern, "{{n}}");
        assert_eq!(id.field_type, FieldType::Number);

        let title = FieldPattern::derive("title", &json!("Buy milk"));
        assert_eq!(title.pattern, "Title {{n}}");
        assert_eq!(title.field_type, FieldType::String);

        let done = FieldPattern::derive("completed", &json!(false));
        assert_eq!(done.pattern, "false");
        assert_eq!(done.field_type, FieldType::Boolean);

        let empty = FieldPattern::derive("notes", &JsonValue::Null);
        assert_eq!(empty.pattern, "");
        assert_eq!(empty.field_type, FieldType::Null);
    }

    #[test]
    fn test_patterns_from_array_response() {
        let payload = json!([{ "id": 1, "title": "a", "completed": true }, { "id": 2 }]);
        let patterns = patterns_from_response(&payload);
        let keys: Vec<_> = patterns.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "title", "completed"]);
    }

    #[test]
    fn test_patterns_from_primitive_response() {
        let patterns = patterns_from_response(&json!("pong"));
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].key, "value");
        assert_eq!(patterns[0].pattern, "pong");
        assert!(patterns_from_response(&json!([])).is_empty());
    }

    #[test]
    fn test_parse_spec() {
        let p = FieldPattern::parse_spec("id={{n}}:number").unwrap();
        assert_eq!((p.key.as_str(), p.pattern.as_str(), p.field_type), ("id", "{{n}}", FieldType::Number));

        let p = FieldPattern::parse_spec("url=https://x.test/a").unwrap();
        assert_eq!(p.pattern, "https://x.test/a");
        assert_eq!(p.field_type, FieldType::String);

        assert!(FieldPattern::parse_spec("=x").is_none());
        assert!(FieldPattern::parse_spec("nokey").is_none());
    }

    #[test]
    fn test_serde_type_field() {
        let p: FieldPattern = serde_json::from_str(r#"{"key":"a","pattern":"1","type":"number"}"#).unwrap();
        assert_eq!(p.field_type, FieldType::Number);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["type"], "number");
    }
}
