//! Terminal output for the command-line harness

pub mod report;
pub mod terminal;

pub use terminal::{colors, colorize, bold, success, error, warning, info, label, muted, format_bytes};
