//! Batch payload generation
//!
//! Produces one JSON object per integer in an inclusive range, either by
//! substituting the sequence token into each pattern (linear) or by
//! synthesizing random values per declared type (chaotic).

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

use crate::errors::{AxiomError, Result};
use crate::variables::{interpolate, Variable, SEQUENCE_TOKEN};
use super::pattern::{FieldPattern, FieldType};

/// One generated payload; key order follows pattern order
pub type BatchItem = Map<String, JsonValue>;

/// Upper bound (exclusive) for chaotic integers
pub const CHAOTIC_INT_CEILING: u32 = 100_000;

/// Most items a single batch may hold
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Length of chaotic string tokens
pub const CHAOTIC_TOKEN_LEN: usize = 7;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How field values are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Substitute the sequence index into each pattern
    #[default]
    Linear,
    /// Random values per declared field type
    Chaotic,
}

/// Inclusive integer range of sequence values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start: i64,
    pub end: i64,
}

impl RangeSpec {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Parse user-entered bounds; anything non-numeric becomes `1`
    pub fn parse(start: &str, end: &str) -> Self {
        let bound = |s: &str| s.trim().parse::<i64>().unwrap_or(1);
        Self::new(bound(start), bound(end))
    }

    /// Parse `START..END`, `START-END` or `START:END`
    pub fn parse_span(s: &str) -> Option<Self> {
        let s = s.trim();
        let (a, b) = s
            .split_once("..")
            .or_else(|| s.split_once(':'))
            .or_else(|| s.get(1..).and_then(|rest| rest.split_once('-')).map(|(a, b)| (&s[..a.len() + 1], b)))?;
        let start = a.trim().parse().ok()?;
        let end = b.trim().parse().ok()?;
        Some(Self::new(start, end))
    }

    /// `max(0, end - start + 1)`
    pub fn len(&self) -> usize {
        let span = (self.end as i128) - (self.start as i128) + 1;
        usize::try_from(span.max(0)).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject ranges holding more than [`MAX_BATCH_SIZE`] items
    pub fn validate(self) -> Result<Self> {
        let len = self.len();
        if len > MAX_BATCH_SIZE {
            return Err(AxiomError::Argument(format!(
                "Range {}..{} holds {} items, more than the limit of {}",
                self.start, self.end, len, MAX_BATCH_SIZE
            )));
        }
        Ok(self)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<i64> {
        self.start..=self.end
    }
}

/// Generate a batch using the thread-local random source.
///
/// Environment placeholders are left in place; see [`BatchGenerator`] to
/// resolve them during generation.
pub fn generate_batch(patterns: &[FieldPattern], start: i64, end: i64, mode: BatchMode) -> Vec<BatchItem> {
    BatchGenerator::new(patterns, mode).generate(RangeSpec::new(start, end), &mut rand::rng())
}

/// Batch generation with an optional variable set and an injected RNG
#[derive(Debug, Clone, Copy)]
pub struct BatchGenerator<'a> {
    patterns: &'a [FieldPattern],
    variables: Option<&'a [Variable]>,
    mode: BatchMode,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(patterns: &'a [FieldPattern], mode: BatchMode) -> Self {
        Self {
            patterns,
            variables: None,
            mode,
        }
    }

    /// Resolve environment placeholders at generation time, before coercion
    pub fn with_variables(mut self, variables: &'a [Variable]) -> Self {
        self.variables = Some(variables);
        self
    }

    /// One item per value in `range`, stopping after [`MAX_BATCH_SIZE`].
    ///
    /// Use [`RangeSpec::validate`] first to report oversized ranges.
    pub fn generate<R: Rng + ?Sized>(&self, range: RangeSpec, rng: &mut R) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(range.len().min(MAX_BATCH_SIZE));
        if range.is_empty() {
            return items;
        }
        for n in range.iter().take(MAX_BATCH_SIZE) {
            items.push(self.item(n, rng));
        }
        items
    }

    /// Build the payload for sequence value `n`
    pub fn item<R: Rng + ?Sized>(&self, n: i64, rng: &mut R) -> BatchItem {
        let mut item = Map::new();
        for field in self.patterns.iter().filter(|p| !p.key.is_empty()) {
            let value = match self.mode {
                BatchMode::Linear => coerce(&self.resolve(&field.pattern, n), field.field_type),
                BatchMode::Chaotic => chaotic_value(field.field_type, rng),
            };
            item.insert(field.key.clone(), value);
        }
        item
    }

    fn resolve(&self, pattern: &str, n: i64) -> String {
        match self.variables {
            Some(vars) => interpolate(pattern, vars, Some(n)),
            None => pattern.replace(SEQUENCE_TOKEN, &n.to_string()),
        }
    }
}

fn chaotic_value<R: Rng + ?Sized>(field_type: FieldType, rng: &mut R) -> JsonValue {
    match field_type {
        FieldType::Number => JsonValue::from(rng.random_range(0..CHAOTIC_INT_CEILING)),
        FieldType::Boolean => JsonValue::Bool(rng.random_bool(0.5)),
        FieldType::String => JsonValue::String(random_token(rng, CHAOTIC_TOKEN_LEN)),
        FieldType::Null => JsonValue::Null,
    }
}

/// Random uppercase base-36 token
pub fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Coerce resolved pattern text to the declared type
pub fn coerce(raw: &str, field_type: FieldType) -> JsonValue {
    match field_type {
        FieldType::String => JsonValue::String(raw.to_string()),
        FieldType::Number => to_number(raw),
        FieldType::Boolean => JsonValue::Bool(raw.eq_ignore_ascii_case("true")),
        FieldType::Null => JsonValue::Null,
    }
}

/// Numeric coercion in the manner of JavaScript's `Number()`.
///
/// Blank text is `0`; `0x`/`0o`/`0b` prefixes are honored; text that is not
/// a finite number folds to `0`. Integral results are emitted as integers.
pub fn to_number(raw: &str) -> JsonValue {
    let t = raw.trim();
    if t.is_empty() {
        return JsonValue::from(0);
    }

    let radix = match t.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&t[2..], radix)
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::from(0));
    }

    if let Ok(i) = t.parse::<i64>() {
        return JsonValue::from(i);
    }

    // Rust accepts "inf"/"nan" spellings; both fold to zero below
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                JsonValue::from(f as i64)
            } else {
                Number::from_f64(f).map(JsonValue::Number).unwrap_or_else(|| JsonValue::from(0))
            }
        }
        _ => JsonValue::from(0),
    }
}

/// Render the request body implied by a pattern set.
///
/// Pure derivation invoked after each pattern edit. Environment variables are
/// resolved; the sequence token is left literal.
pub fn render_body(patterns: &[FieldPattern], variables: &[Variable]) -> String {
    let mut obj = Map::new();
    for field in patterns.iter().filter(|p| !p.key.is_empty()) {
        let text = interpolate(&field.pattern, variables, None);
        obj.insert(field.key.clone(), coerce(&text, field.field_type));
    }
    serde_json::to_string_pretty(&JsonValue::Object(obj)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn id_pattern() -> Vec<FieldPattern> {
        vec![FieldPattern::new("id", "{{n}}", FieldType::Number)]
    }

    #[test]
    fn test_oversized_range_is_rejected_and_bounded() {
        let full = RangeSpec::new(i64::MIN, i64::MAX);
        assert!(matches!(full.validate(), Err(AxiomError::Argument(_))));
        assert!(RangeSpec::new(1, MAX_BATCH_SIZE as i64).validate().is_ok());
        assert!(RangeSpec::new(1, MAX_BATCH_SIZE as i64 + 1).validate().is_err());
        assert!(RangeSpec::new(5, 1).validate().is_ok());

        let batch = generate_batch(&id_pattern(), i64::MIN, i64::MAX, BatchMode::Linear);
        assert_eq!(batch.len(), MAX_BATCH_SIZE);
        assert_eq!(batch[0]["id"], json!(i64::MIN));
    }

    #[test]
    fn test_batch_size_law() {
        let patterns = id_pattern();
        assert_eq!(generate_batch(&patterns, 5, 5, BatchMode::Linear).len(), 1);
        assert_eq!(generate_batch(&patterns, 5, 2, BatchMode::Linear).len(), 0);
        assert_eq!(generate_batch(&patterns, -2, 2, BatchMode::Linear).len(), 5);
    }

    #[test]
    fn test_range_spec() {
        assert_eq!(RangeSpec::parse("3", "abc"), RangeSpec::new(3, 1));
        assert_eq!(RangeSpec::parse("", " 9 "), RangeSpec::new(1, 9));
        assert!(RangeSpec::new(5, 2).is_empty());
        assert_eq!(RangeSpec::new(i64::MIN, i64::MAX).len(), usize::MAX);
        assert_eq!(RangeSpec::parse_span("10..12"), Some(RangeSpec::new(10, 12)));
        assert_eq!(RangeSpec::parse_span("1-5"), Some(RangeSpec::new(1, 5)));
        assert_eq!(RangeSpec::parse_span("-3:4"), Some(RangeSpec::new(-3, 4)));
        assert_eq!(RangeSpec::parse_span("x..y"), None);
    }

    #[test]
    fn test_linear_substitution() {
        let patterns = vec![
            FieldPattern::new("id", "{{n}}", FieldType::Number),
            FieldPattern::new("title", "Item {{n}} of {{n}}", FieldType::String),
        ];
        let batch = generate_batch(&patterns, 10, 11, BatchMode::Linear);
        assert_eq!(JsonValue::Object(batch[0].clone()), json!({ "id": 10, "title": "Item 10 of 10" }));
        assert_eq!(JsonValue::Object(batch[1].clone()), json!({ "id": 11, "title": "Item 11 of 11" }));
    }

    #[test]
    fn test_linear_keeps_env_tokens_without_variables() {
        let patterns = vec![FieldPattern::new("owner", "{{user}}-{{n}}", FieldType::String)];
        let batch = generate_batch(&patterns, 1, 1, BatchMode::Linear);
        assert_eq!(batch[0]["owner"], "{{user}}-1");
    }

    #[test]
    fn test_linear_resolves_with_variables() {
        let patterns = vec![
            FieldPattern::new("owner", "{{user}}-{{n}}", FieldType::String),
            FieldPattern::new("base", "{{offset}}", FieldType::Number),
        ];
        let vars = vec![Variable::new("user", "ana"), Variable::new("offset", "100")];
        let mut rng = StdRng::seed_from_u64(1);
        let batch = BatchGenerator::new(&patterns, BatchMode::Linear)
            .with_variables(&vars)
            .generate(RangeSpec::new(3, 3), &mut rng);
        assert_eq!(batch[0]["owner"], "ana-3");
        assert_eq!(batch[0]["base"], 100);
    }

    #[test]
    fn test_linear_deterministic() {
        let patterns = vec![
            FieldPattern::new("id", "{{n}}", FieldType::Number),
            FieldPattern::new("name", "Name {{n}}", FieldType::String),
        ];
        let a = serde_json::to_string(&generate_batch(&patterns, 1, 20, BatchMode::Linear)).unwrap();
        let b = serde_json::to_string(&generate_batch(&patterns, 1, 20, BatchMode::Linear)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_chaotic_varies() {
        let patterns = vec![
            FieldPattern::new("id", "{{n}}", FieldType::Number),
            FieldPattern::new("code", "{{n}}", FieldType::String),
        ];
        let a = generate_batch(&patterns, 1, 50, BatchMode::Chaotic);
        let b = generate_batch(&patterns, 1, 50, BatchMode::Chaotic);
        let same_codes = a.iter().zip(&b).filter(|(x, y)| x["code"] == y["code"]).count();
        let same_ids = a.iter().zip(&b).filter(|(x, y)| x["id"] == y["id"]).count();
        assert!(same_codes <= 1, "codes matched {} times", same_codes);
        assert!(same_ids <= 3, "ids matched {} times", same_ids);
    }

    #[test]
    fn test_chaotic_seeded_is_reproducible() {
        let patterns = vec![FieldPattern::new("token", "x", FieldType::String)];
        let gen = BatchGenerator::new(&patterns, BatchMode::Chaotic);
        let a = gen.generate(RangeSpec::new(1, 5), &mut StdRng::seed_from_u64(42));
        let b = gen.generate(RangeSpec::new(1, 5), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_chaotic_value_shapes() {
        let patterns = vec![
            FieldPattern::new("n", "{{n}}", FieldType::Number),
            FieldPattern::new("b", "true", FieldType::Boolean),
            FieldPattern::new("s", "literal", FieldType::String),
            FieldPattern::new("z", "whatever", FieldType::Null),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let batch = BatchGenerator::new(&patterns, BatchMode::Chaotic).generate(RangeSpec::new(1, 30), &mut rng);
        for item in &batch {
            let n = item["n"].as_u64().unwrap();
            assert!(n < CHAOTIC_INT_CEILING as u64);
            assert!(item["b"].is_boolean());
            let s = item["s"].as_str().unwrap();
            assert_eq!(s.len(), CHAOTIC_TOKEN_LEN);
            assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            assert!(item["z"].is_null());
        }
    }

    #[test]
    fn test_type_coercion() {
        let patterns = vec![
            FieldPattern::new("flag", "true", FieldType::Boolean),
            FieldPattern::new("shout", "TRUE", FieldType::Boolean),
            FieldPattern::new("count", "abc", FieldType::Number),
            FieldPattern::new("nothing", "text", FieldType::Null),
        ];
        for item in generate_batch(&patterns, 1, 3, BatchMode::Linear) {
            assert_eq!(item["flag"], JsonValue::Bool(true));
            assert_eq!(item["shout"], JsonValue::Bool(true));
            assert_eq!(item["count"], json!(0));
            assert_eq!(item["nothing"], JsonValue::Null);
        }
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(""), json!(0));
        assert_eq!(to_number("  12 "), json!(12));
        assert_eq!(to_number("-4"), json!(-4));
        assert_eq!(to_number("1.5"), json!(1.5));
        assert_eq!(to_number("1e3"), json!(1000));
        assert_eq!(to_number("0x1F"), json!(31));
        assert_eq!(to_number("0b101"), json!(5));
        assert_eq!(to_number("Infinity"), json!(0));
        assert_eq!(to_number("inf"), json!(0));
        assert_eq!(to_number("12abc"), json!(0));
    }

    #[test]
    fn test_empty_keys_dropped_and_order_kept() {
        let patterns = vec![
            FieldPattern::new("zeta", "1", FieldType::Number),
            FieldPattern::new("", "ignored", FieldType::String),
            FieldPattern::new("alpha", "2", FieldType::Number),
        ];
        let batch = generate_batch(&patterns, 1, 1, BatchMode::Linear);
        let keys: Vec<_> = batch[0].keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(serde_json::to_string(&batch[0]).unwrap(), r#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_render_body() {
        let patterns = vec![
            FieldPattern::new("title", "Hello {{who}}", FieldType::String),
            FieldPattern::new("completed", "false", FieldType::Boolean),
            FieldPattern::new("id", "{{n}}", FieldType::String),
        ];
        let body = render_body(&patterns, &[Variable::new("who", "world")]);
        let parsed: JsonValue = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, json!({ "title": "Hello world", "completed": false, "id": "{{n}}" }));
        assert!(body.contains("\n  \"title\""));
    }
}
