//! CLI argument definitions using clap

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::batch::BatchMode;
use crate::http::HttpMethod;
use crate::transmit::Strategy;

/// Axiom - API workbench: environments, batch generation and transmission
#[derive(Parser, Debug, Clone)]
#[command(name = "axiom", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Workbench backup to load environments from (and record history into)
    #[arg(long = "workbench", value_name = "FILE", global = true)]
    pub workbench: Option<PathBuf>,

    /// Environment to activate, by name
    #[arg(short = 'E', long = "environment", value_name = "NAME", global = true)]
    pub environment: Option<String>,

    /// Ad-hoc variable, overrides the active environment
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", global = true)]
    pub env: Vec<String>,

    /// Per-request timeout (e.g. "10s", "1m"); "off" disables it
    #[arg(long = "timeout", value_name = "DURATION", value_parser = parse_timeout, global = true)]
    pub timeout: Option<TimeoutArg>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long = "insecure", action = ArgAction::SetTrue, global = true)]
    pub insecure: bool,

    /// Alternate config file
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(long = "debug", action = ArgAction::SetTrue, global = true)]
    pub debug: bool,

    /// Log format for stderr diagnostics
    #[arg(long = "log-format", value_enum, value_name = "FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Send a single request and show the response
    Send(SendArgs),

    /// Generate a batch of payloads and transmit them
    Batch(BatchArgs),

    /// Parse a curl command (optionally sending it)
    ImportCurl(ImportCurlArgs),

    /// Print a request as a curl command with variables resolved
    ExportCurl(ExportCurlArgs),

    /// Probe an endpoint periodically and report health
    Monitor(MonitorArgs),
}

/// Method, URL, headers and body of a request template
#[derive(ClapArgs, Debug, Clone)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(value_name = "METHOD")]
    pub method: HttpMethod,

    /// Request URL; may contain {{variables}} and {{n}}
    #[arg(value_name = "URL")]
    pub url: String,

    /// Header as "Name: value"
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long = "body", value_name = "BODY", conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the request body from a file
    #[arg(long = "body-file", value_name = "FILE")]
    pub body_file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Print response headers
    #[arg(short = 'i', long = "include", action = ArgAction::SetTrue)]
    pub include_headers: bool,

    /// Save the request to the workbench library under this name
    #[arg(long = "save", value_name = "NAME")]
    pub save: Option<String>,

    /// Exit with an error status for non-2xx responses
    #[arg(long = "check-status", action = ArgAction::SetTrue)]
    pub check_status: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Field pattern as "key=pattern[:type]" (type: string, number, boolean, null)
    #[arg(short = 'f', long = "field", value_name = "SPEC")]
    pub fields: Vec<String>,

    /// Sample response (JSON file) to derive fields and the id range from
    #[arg(long = "sample", value_name = "FILE")]
    pub sample: Option<PathBuf>,

    /// GET this URL first and derive fields and the id range from its response
    #[arg(long = "infer-from", value_name = "URL", conflicts_with = "sample")]
    pub infer_from: Option<String>,

    /// Inclusive sequence range, e.g. "1..10"
    #[arg(short = 'r', long = "range", value_name = "START..END", conflicts_with_all = ["start", "end"])]
    pub range: Option<String>,

    /// First sequence value
    #[arg(long = "start", value_name = "N")]
    pub start: Option<String>,

    /// Last sequence value
    #[arg(long = "end", value_name = "N")]
    pub end: Option<String>,

    /// Send a hand-written JSON array instead of generating one
    #[arg(long = "raw", value_name = "FILE", conflicts_with_all = ["fields", "sample", "infer_from"])]
    pub raw: Option<PathBuf>,

    /// Generation mode
    #[arg(short = 'm', long = "mode", value_enum)]
    pub mode: Option<BatchMode>,

    /// Transmission strategy
    #[arg(short = 's', long = "strategy", value_enum)]
    pub strategy: Option<Strategy>,

    /// Print the generated batch and exit without sending
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Emit the final log as JSON on stdout
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,

    /// Hide the progress bar
    #[arg(long = "no-progress", action = ArgAction::SetTrue)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ImportCurlArgs {
    /// The curl command; "-" reads it from stdin
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Send the imported request
    #[arg(long = "send", action = ArgAction::SetTrue)]
    pub send: bool,

    /// Save the imported request to the workbench library under this name
    #[arg(long = "save", value_name = "NAME")]
    pub save: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExportCurlArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MonitorArgs {
    /// Endpoint to probe
    #[arg(value_name = "URL")]
    pub url: String,

    /// Time between probes
    #[arg(long = "interval", value_name = "DURATION", default_value = "5s", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// Number of samples kept for statistics
    #[arg(long = "window", value_name = "N", default_value_t = crate::monitor::DEFAULT_WINDOW)]
    pub window: usize,

    /// Stop after this many probes
    #[arg(short = 'n', long = "count", value_name = "N")]
    pub count: Option<usize>,
}

/// Log format for stderr diagnostics
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON Lines format for parsing
    Json,
}

/// `--timeout` value; `None` means no timeout at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutArg(pub Option<Duration>);

fn parse_timeout(s: &str) -> Result<TimeoutArg, String> {
    match s.trim() {
        "off" | "none" | "0" => Ok(TimeoutArg(None)),
        other => humantime::parse_duration(other)
            .map(|d| TimeoutArg(Some(d)))
            .map_err(|e| e.to_string()),
    }
}
