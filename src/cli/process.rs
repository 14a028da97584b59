//! Post-processing argument logic
//!
//! Turns parsed CLI arguments into workbench values: a request template, the
//! variable set for this invocation, and the batch range.

use crate::batch::RangeSpec;
use crate::cli::args::{Args, BatchArgs, RequestArgs};
use crate::errors::{AxiomError, Result};
use crate::http::HttpMethod;
use crate::models::{ApiRequest, HeaderEntry};
use crate::range::{clamp_end, default_range, RangeInfo};
use crate::variables::{has_placeholders, EnvironmentStore, Variable};
use url::Url;

/// Check if a string has a valid URL scheme (e.g., "http://", "https://")
/// Per RFC 3986: scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn has_url_scheme(s: &str) -> bool {
    if let Some(pos) = s.find("://") {
        let scheme = &s[..pos];
        !scheme.is_empty()
            && scheme.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
            && scheme.chars().skip(1).all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    } else {
        false
    }
}

/// Parse localhost shorthand (:PORT/path or :/path)
/// Returns (port, rest) if it matches the pattern
fn parse_localhost_shorthand(s: &str) -> Option<(&str, &str)> {
    // Must start with : but not :: (IPv6)
    if !s.starts_with(':') || s.starts_with("::") {
        return None;
    }

    let after_colon = &s[1..];
    let (port, rest) = match after_colon.find('/') {
        Some(slash_pos) => (&after_colon[..slash_pos], &after_colon[slash_pos..]),
        None => (after_colon, ""),
    };

    if port.chars().all(|c| c.is_ascii_digit()) {
        Some((port, rest))
    } else {
        None
    }
}

/// Normalize a URL template: add a scheme, expand `:PORT` shorthand.
///
/// Templates that begin with a placeholder (`{{base}}/users`) are left alone,
/// and templates with placeholders are not validated until they are resolved.
pub fn process_url(raw_url: &str) -> Result<String> {
    let mut url = raw_url.trim().to_string();

    if url.starts_with("{{") {
        return Ok(url);
    }

    // Handle :// paste shortcut
    if let Some(rest) = url.strip_prefix("://") {
        url = rest.to_string();
    }

    if !has_url_scheme(&url) {
        if let Some((port, rest)) = parse_localhost_shorthand(&url) {
            url = if port.is_empty() {
                format!("localhost{}", rest)
            } else {
                format!("localhost:{}{}", port, rest)
            };
        }
        url = format!("http://{}", url);
    }

    if !has_placeholders(&url) {
        Url::parse(&url).map_err(|e| AxiomError::Argument(format!("Invalid URL '{}': {}", url, e)))?;
    }

    Ok(url)
}

/// Build the request template from `METHOD URL -H ... --body ...`
pub fn build_request(args: &RequestArgs) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(args.method, process_url(&args.url)?);

    for line in &args.headers {
        let header = HeaderEntry::parse_line(line)
            .ok_or_else(|| AxiomError::Argument(format!("Invalid header '{}', expected 'Name: value'", line)))?;
        request.headers.push(header);
    }

    request.body = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };

    Ok(request)
}

/// The variable set for this invocation.
///
/// `--environment` switches the active environment first; `--env` pairs are
/// appended after its variables so they win on lookup.
pub fn resolve_variables(args: &Args, store: &mut EnvironmentStore) -> Result<Vec<Variable>> {
    if let Some(name) = &args.environment {
        let id = store
            .find_by_name(name)
            .map(|e| e.id.clone())
            .ok_or_else(|| AxiomError::Environment(format!("No environment named '{}'", name)))?;
        store.activate(&id)?;
    }

    let mut variables = store.active_variables().to_vec();
    for assignment in &args.env {
        let variable = Variable::parse_assignment(assignment)
            .ok_or_else(|| AxiomError::Argument(format!("Invalid variable '{}', expected KEY=VALUE", assignment)))?;
        variables.push(variable);
    }
    Ok(variables)
}

/// Work out the batch range from `--range`/`--start`/`--end` and what is
/// known about existing ids.
///
/// Missing bounds come from the inferred default. For verbs that target
/// existing records the end is clamped to the highest known id.
pub fn resolve_range(args: &BatchArgs, method: HttpMethod, info: Option<&RangeInfo>) -> Result<RangeSpec> {
    let (default_start, default_end) = default_range(method, info);

    let mut range = match &args.range {
        Some(span) => RangeSpec::parse_span(span)
            .ok_or_else(|| AxiomError::Argument(format!("Invalid range '{}', expected START..END", span)))?,
        None => {
            let start = args.start.clone().unwrap_or_else(|| default_start.to_string());
            let end = args.end.clone().unwrap_or_else(|| default_end.to_string());
            RangeSpec::parse(&start, &end)
        }
    };

    range.end = clamp_end(method, info, range.end);
    range.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn batch_args(extra: &[&str]) -> BatchArgs {
        let mut argv = vec!["axiom", "batch", "DELETE", "http://x.test/{{n}}"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            crate::cli::args::Command::Batch(b) => b,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_process_url_with_scheme() {
        assert_eq!(process_url("https://example.com").unwrap(), "https://example.com");
    }

    #[test]
    fn test_process_url_without_scheme() {
        assert_eq!(process_url("example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_process_url_localhost_shorthand() {
        assert_eq!(process_url(":3000/api").unwrap(), "http://localhost:3000/api");
    }

    #[test]
    fn test_process_url_paste_shortcut() {
        assert_eq!(process_url("://example.com/path").unwrap(), "http://example.com/path");
    }

    #[test]
    fn test_process_url_templates() {
        assert_eq!(process_url("{{base}}/users").unwrap(), "{{base}}/users");
        assert_eq!(process_url("{{host}}:8080/x").unwrap(), "{{host}}:8080/x");
        assert_eq!(process_url("api.test/items/{{n}}").unwrap(), "http://api.test/items/{{n}}");
    }

    #[test]
    fn test_build_request_rejects_bad_header() {
        let args = RequestArgs {
            method: HttpMethod::Post,
            url: "http://x.test".into(),
            headers: vec!["NoColon".into()],
            body: None,
            body_file: None,
        };
        assert!(matches!(build_request(&args), Err(AxiomError::Argument(_))));
    }

    #[test]
    fn test_resolve_variables_overrides_and_environment() {
        let mut store = EnvironmentStore::new();
        store.set_variable("host", "global.x");
        let staging = store.create("Staging");
        store.get_mut(&staging).unwrap().set("host", "staging.x");

        let args = Args::try_parse_from(["axiom", "-E", "Staging", "-e", "token=abc", "monitor", "http://x"]).unwrap();
        let vars = resolve_variables(&args, &mut store).unwrap();
        assert_eq!(vars, vec![Variable::new("host", "staging.x"), Variable::new("token", "abc")]);
        assert_eq!(store.active().name, "Staging");

        let args = Args::try_parse_from(["axiom", "-E", "Prod", "monitor", "http://x"]).unwrap();
        assert!(matches!(resolve_variables(&args, &mut store), Err(AxiomError::Environment(_))));
    }

    #[test]
    fn test_resolve_range_clamps_delete() {
        let info = RangeInfo { key: "id".into(), max: 42 };
        let range = resolve_range(&batch_args(&["--end", "100"]), HttpMethod::Delete, Some(&info)).unwrap();
        assert_eq!(range, RangeSpec::new(1, 42));

        let range = resolve_range(&batch_args(&[]), HttpMethod::Delete, None).unwrap();
        assert_eq!(range, RangeSpec::new(1, 10));
    }

    #[test]
    fn test_resolve_range_creation_defaults() {
        let info = RangeInfo { key: "ID".into(), max: 7 };
        let range = resolve_range(&batch_args(&[]), HttpMethod::Post, Some(&info)).unwrap();
        assert_eq!(range, RangeSpec::new(8, 17));

        let range = resolve_range(&batch_args(&["--range", "3..5"]), HttpMethod::Post, Some(&info)).unwrap();
        assert_eq!(range, RangeSpec::new(3, 5));
        assert!(resolve_range(&batch_args(&["--range", "x"]), HttpMethod::Post, None).is_err());
    }

    #[test]
    fn test_resolve_range_rejects_huge_span() {
        let err = resolve_range(&batch_args(&["--range", "1..20000"]), HttpMethod::Post, None).unwrap_err();
        assert!(matches!(err, AxiomError::Argument(_)));
        assert!(resolve_range(&batch_args(&["--start", "1", "--end", "9223372036854775807"]), HttpMethod::Post, None).is_err());
    }
}
