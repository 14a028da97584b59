//! User configuration (`config.toml`)

#[allow(clippy::module_inception)]
mod config;

pub use config::{Config, Defaults};
