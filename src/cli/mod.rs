//! CLI argument parsing and processing

pub mod args;
pub mod process;

// Re-exports
pub use args::{Args, Command, LogFormat};
pub use process::{build_request, process_url, resolve_range, resolve_variables};
