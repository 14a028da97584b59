//! ID range inference from response payloads
//!
//! Scans a parsed response for the highest integer stored under a property
//! named `id` (any casing) and turns it into default bounds for a batch run.
//! Only direct properties of the top-level object, or of each top-level array
//! element, are inspected. Nested objects are not descended into.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::http::HttpMethod;

/// Range used when nothing could be inferred
pub const FALLBACK_RANGE: (i64, i64) = (1, 10);

/// Number of records a creation batch proposes after the current maximum
pub const CREATION_SPAN: i64 = 10;

/// The highest identifier found in a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInfo {
    /// Property name as it appeared in the payload
    pub key: String,
    pub max: i64,
}

/// Find the maximum `id` in an object or array payload
pub fn find_max_id(payload: &JsonValue) -> Option<RangeInfo> {
    match payload {
        JsonValue::Array(items) => items
            .iter()
            .filter_map(scan_object)
            .fold(None::<RangeInfo>, |best, found| match best {
                Some(b) if b.max >= found.max => Some(b),
                _ => Some(found),
            }),
        JsonValue::Object(_) => scan_object(payload),
        _ => None,
    }
}

fn scan_object(value: &JsonValue) -> Option<RangeInfo> {
    let map = value.as_object()?;
    let mut best: Option<RangeInfo> = None;
    for (key, val) in map {
        if key.to_lowercase() != "id" {
            continue;
        }
        let Some(parsed) = parse_int(val) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| parsed > b.max) {
            best = Some(RangeInfo { key: key.clone(), max: parsed });
        }
    }
    best
}

/// Integer parsing in the manner of JavaScript's `parseInt(value, 10)`.
///
/// Numbers are truncated toward zero; strings yield their leading
/// `[+-]?digits` prefix after leading whitespace.
pub fn parse_int(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).ok()
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
            }
        }
        JsonValue::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Default `[start, end]` for a batch given the verb about to be used.
///
/// Creation starts right after the known maximum; every other verb walks the
/// records that already exist.
pub fn default_range(method: HttpMethod, info: Option<&RangeInfo>) -> (i64, i64) {
    match info {
        Some(info) if method.is_creation() => (
            info.max.saturating_add(1),
            info.max.saturating_add(CREATION_SPAN),
        ),
        Some(info) => (1, info.max),
        None => FALLBACK_RANGE,
    }
}

/// Clip a requested upper bound so non-creation verbs never address ids
/// beyond the known maximum.
pub fn clamp_end(method: HttpMethod, info: Option<&RangeInfo>, requested_end: i64) -> i64 {
    match info {
        Some(info) if !method.is_creation() && requested_end > info.max => {
            tracing::debug!(requested_end, max = info.max, method = %method, "Clamping batch range end");
            info.max
        }
        _ => requested_end,
    }
}
