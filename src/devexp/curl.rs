//! Curl command generation
//!
//! Renders a workbench request as a multi-line curl command with variables
//! already substituted, ready to paste into a shell.

use console::style;

use crate::http::HttpMethod;
use crate::models::ApiRequest;
use crate::variables::{interpolate, Variable};

const CONTINUATION: &str = " \\\n";

/// Generate an equivalent curl command from the request.
///
/// Only enabled headers are emitted; the body is attached for every verb
/// except `GET` when it is non-empty.
pub fn to_curl(request: &ApiRequest, variables: &[Variable]) -> String {
    let resolve = |s: &str| interpolate(s, variables, None);

    let mut lines = vec![format!(
        "curl --location --request {} {}",
        request.method,
        single_quote(&resolve(&request.url))
    )];

    for header in request.active_headers() {
        lines.push(format!(
            "--header {}",
            single_quote(&format!("{}: {}", resolve(&header.key), resolve(&header.value)))
        ));
    }

    let body = resolve(&request.body);
    if request.method != HttpMethod::Get && !body.is_empty() {
        lines.push(format!("--data-raw {}", single_quote(&body)));
    }

    lines.join(CONTINUATION)
}

/// Wrap in single quotes, closing and reopening around embedded quotes
fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Colorize a generated command for terminal display
pub fn format_curl_pretty(cmd: &str) -> String {
    cmd.split(CONTINUATION)
        .map(|line| {
            let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
            let rest = rest
                .split(' ')
                .map(|word| {
                    if word.starts_with("--") {
                        style(word).cyan().to_string()
                    } else {
                        word.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let head = if head == "curl" {
                style(head).yellow().bold().to_string()
            } else {
                style(head).cyan().to_string()
            };
            if rest.is_empty() {
                head
            } else {
                format!("{} {}", head, rest)
            }
        })
        .collect::<Vec<_>>()
        .join(CONTINUATION)
}
