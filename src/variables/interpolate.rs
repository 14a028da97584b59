//! `{{key}}` template interpolation
//!
//! Placeholders are resolved in a single left-to-right pass. Substituted
//! values are never re-scanned, and placeholders that match neither a
//! variable nor the sequence token are left in the output verbatim so that
//! they fail visibly at the server rather than silently disappearing.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::Variable;

/// The reserved placeholder resolved to the current batch index
pub const SEQUENCE_KEY: &str = "n";

/// Literal sequence token as it appears in templates
pub const SEQUENCE_TOKEN: &str = "{{n}}";

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([^{}]*)\}\}").expect("Invalid placeholder regex")
});

/// Replace every `{{key}}` in `template`.
///
/// `{{n}}` resolves to `sequence` when one is given, even if a variable
/// named `n` exists. Variables with an empty key never match.
pub fn interpolate(template: &str, variables: &[Variable], sequence: Option<i64>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    let lookup = lookup_table(variables);

    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            if key == SEQUENCE_KEY {
                if let Some(n) = sequence {
                    return n.to_string();
                }
            }
            match lookup.get(key) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Keys of every placeholder in `template`, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Placeholders that [`interpolate`] would leave unresolved
pub fn unresolved(template: &str, variables: &[Variable], sequence: Option<i64>) -> Vec<String> {
    let lookup = lookup_table(variables);
    let mut missing = Vec::new();
    for key in placeholders(template) {
        let is_sequence = key == SEQUENCE_KEY && sequence.is_some();
        if !is_sequence && !lookup.contains_key(key.as_str()) && !missing.contains(&key) {
            missing.push(key);
        }
    }
    missing
}

/// Check if a string contains any `{{...}}` placeholder
pub fn has_placeholders(s: &str) -> bool {
    PLACEHOLDER_RE.is_match(s)
}

// Later entries overwrite earlier ones: last write wins.
fn lookup_table(variables: &[Variable]) -> HashMap<&str, &str> {
    variables
        .iter()
        .filter(|v| !v.key.is_empty())
        .map(|v| (v.key.as_str(), v.value.as_str()))
        .collect()
}
