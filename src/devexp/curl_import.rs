//! cURL command import
//!
//! Parses a pasted curl command into a workbench request.
//!
//! ```text
//! curl --location --request PUT 'https://api.example.com/users/1' \
//!   --header 'Content-Type: application/json' \
//!   --data-raw '{"name":"John"}'
//! ```

use std::str::FromStr;

use crate::errors::{AxiomError, Result};
use crate::http::HttpMethod;
use crate::models::{ApiRequest, HeaderEntry};

/// Parsed curl command structure
#[derive(Debug, Default, PartialEq)]
pub struct ParsedCurl {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    pub data: Option<String>,
    pub user: Option<String>,
    pub follow_redirects: bool,
    pub insecure: bool,
    pub compressed: bool,
}

/// Parse a curl command string into a ParsedCurl structure
pub fn parse_curl_command(cmd: &str) -> Result<ParsedCurl> {
    let tokens = tokenize_curl(cmd)?;
    parse_tokens(&tokens)
}

/// Parse a curl command straight into a request
pub fn parse_curl(cmd: &str) -> Result<ApiRequest> {
    parse_curl_command(cmd)?.into_request()
}

/// Tokenize a curl command, handling quotes and line continuations
fn tokenize_curl(cmd: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for c in cmd.chars() {
        if escape_next {
            escape_next = false;
            // `\` at end of line continues the command
            if c == '\n' || c == '\r' {
                continue;
            }
            current.push(c);
            continue;
        }

        match c {
            '\\' if !in_single_quote => escape_next = true,
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ' ' | '\t' | '\n' | '\r' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    if in_single_quote || in_double_quote {
        return Err(AxiomError::Curl("Unterminated quote in curl command".to_string()));
    }

    Ok(tokens)
}

/// Parse tokenized curl command
fn parse_tokens(tokens: &[String]) -> Result<ParsedCurl> {
    let mut parsed = ParsedCurl::default();
    let mut iter = tokens.iter().peekable();

    match iter.peek() {
        Some(first) if first.eq_ignore_ascii_case("curl") => {
            iter.next();
        }
        _ => return Err(AxiomError::Curl("Command must start with 'curl'".to_string())),
    }

    while let Some(token) = iter.next() {
        if !token.starts_with('-') {
            if parsed.url.is_none() {
                parsed.url = Some(token.clone());
            }
            continue;
        }

        // Combined short flags like -sSL
        if !token.starts_with("--") && token.len() > 2 && token[1..].chars().all(|c| "sSLkvi".contains(c)) {
            for c in token[1..].chars() {
                match c {
                    'L' => parsed.follow_redirects = true,
                    'k' => parsed.insecure = true,
                    _ => {}
                }
            }
            continue;
        }

        match token.as_str() {
            "-X" | "--request" => {
                parsed.method = iter.next().map(|m| m.to_uppercase());
            }
            "-H" | "--header" => {
                if let Some((name, value)) = iter.next().and_then(|h| parse_header(h)) {
                    parsed.headers.push((name, value));
                }
            }
            "-d" | "--data" | "--data-ascii" | "--data-binary" | "--data-raw" => {
                if let Some(data) = iter.next() {
                    match &mut parsed.data {
                        Some(existing) => {
                            existing.push('&');
                            existing.push_str(data);
                        }
                        None => parsed.data = Some(data.clone()),
                    }
                }
            }
            "--url" => {
                parsed.url = iter.next().cloned();
            }
            "-u" | "--user" => {
                parsed.user = iter.next().cloned();
            }
            "-L" | "--location" | "--location-trusted" => parsed.follow_redirects = true,
            "-k" | "--insecure" => parsed.insecure = true,
            "--compressed" => parsed.compressed = true,
            "-G" | "--get" => {
                if parsed.method.is_none() {
                    parsed.method = Some("GET".to_string());
                }
            }
            // Unknown long flag: swallow its argument if it has one
            opt if opt.starts_with("--") => {
                if iter.peek().is_some_and(|next| !next.starts_with('-')) {
                    iter.next();
                }
            }
            opt if opt.len() == 2 => {
                let flag_char = opt.chars().nth(1).unwrap_or('_');
                if "oOTAebcxmErw".contains(flag_char) {
                    iter.next();
                }
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Parse a header string "Name: Value"
fn parse_header(header: &str) -> Option<(String, String)> {
    let (name, value) = header.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

impl ParsedCurl {
    /// Convert into a request. Data without an explicit method implies POST.
    pub fn into_request(self) -> Result<ApiRequest> {
        let url = self
            .url
            .ok_or_else(|| AxiomError::Curl("No URL found in curl command".to_string()))?;

        let method = match self.method.as_deref() {
            Some(m) => HttpMethod::from_str(m).map_err(|_| AxiomError::Curl(format!("Unsupported method: {}", m)))?,
            None if self.data.is_some() => HttpMethod::Post,
            None => HttpMethod::Get,
        };

        let mut request = ApiRequest::new(method, url);
        request.headers = self
            .headers
            .into_iter()
            .map(|(name, value)| HeaderEntry::new(name, value))
            .collect();
        if let Some(user) = self.user {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(user.as_bytes());
            request.headers.push(HeaderEntry::new("Authorization", format!("Basic {}", encoded)));
        }
        request.body = self.data.unwrap_or_default();
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_get() {
        let req = parse_curl("curl https://example.com").unwrap();
        assert_eq!(req.url, "https://example.com");
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_data_implies_post() {
        let req = parse_curl(r#"curl -d '{"a":1}' https://example.com"#).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body, r#"{"a":1}"#);
    }

    #[test]
    fn test_multiline_export_format() {
        let cmd = "curl --location --request PUT 'https://api.x/users/{{n}}' \\\n--header 'Content-Type: application/json' \\\n--header 'X-Trace: a:b' \\\n--data-raw '{\"name\": \"John Smith\"}'";
        let req = parse_curl(cmd).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://api.x/users/{{n}}");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.headers[1].key, "X-Trace");
        assert_eq!(req.headers[1].value, "a:b");
        assert_eq!(req.body, r#"{"name": "John Smith"}"#);
    }

    #[test]
    fn test_flags_and_url_option() {
        let parsed = parse_curl_command("curl -sSLk --compressed --url https://example.com").unwrap();
        assert!(parsed.follow_redirects);
        assert!(parsed.insecure);
        assert!(parsed.compressed);
        assert_eq!(parsed.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_user_becomes_basic_auth() {
        let req = parse_curl("curl -u user:pass https://example.com").unwrap();
        assert_eq!(req.headers[0].key, "Authorization");
        assert_eq!(req.headers[0].value, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_curl("wget https://x"), Err(AxiomError::Curl(_))));
        assert!(matches!(parse_curl("curl -X POST"), Err(AxiomError::Curl(_))));
        assert!(matches!(parse_curl("curl -X HEAD https://x"), Err(AxiomError::Curl(_))));
        assert!(matches!(parse_curl("curl 'https://x"), Err(AxiomError::Curl(_))));
    }

    #[test]
    fn test_tokenize_quotes() {
        let tokens = tokenize_curl(r#"curl -H 'Content-Type: application/json' "https://example.com""#).unwrap();
        assert_eq!(tokens, vec!["curl", "-H", "Content-Type: application/json", "https://example.com"]);
    }
}
