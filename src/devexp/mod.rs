//! Developer experience helpers
//!
//! - **Curl Import**: parse a pasted curl command into a request
//! - **Curl Export**: render a request as a curl command with variables resolved
//!
//! ```bash
//! axiom import-curl "curl -X POST -H 'Content-Type: application/json' -d '{\"name\":\"John\"}' https://api.example.com/users"
//! axiom export-curl PUT 'https://{{host}}/users/1' -H 'Content-Type: application/json' --body '{"name":"John"}'
//! ```

pub mod curl;
pub mod curl_import;

pub use curl::{format_curl_pretty, to_curl};
pub use curl_import::{parse_curl, parse_curl_command, ParsedCurl};
