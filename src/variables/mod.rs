//! Variables, environments and `{{key}}` interpolation

mod environment;
mod interpolate;

use serde::{Deserialize, Serialize};

pub use environment::{Environment, EnvironmentStore, DEFAULT_ENVIRONMENT_NAME};
pub use interpolate::{
    has_placeholders, interpolate, placeholders, unresolved, SEQUENCE_KEY, SEQUENCE_TOKEN,
};

/// A single key/value pair. Empty keys never match a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `KEY=value` assignment
    pub fn parse_assignment(s: &str) -> Option<Self> {
        let (key, value) = s.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, value))
    }
}
